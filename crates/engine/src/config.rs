//! Access layer configuration via `bazaar.toml`
//!
//! A default file can be written next to the application on first start.
//! Every key is optional; missing keys take the defaults shown in
//! [`AccessConfig::default_toml`].

use crate::retry::RetryPolicy;
use bazaar_core::{Error, StoreCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "bazaar.toml";

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("Failed to access config file '{path}': {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A value is out of range
    #[error("Invalid config value for '{key}': {reason}")]
    Invalid {
        /// Offending key
        key: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

/// What `create` returns after writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatePolicy {
    /// Re-read the written document and return the stored value
    #[default]
    Reread,
    /// Return the input with id and timestamps, without a read
    Echo,
}

/// Retry settings, as written in the `[retry]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first included
    pub max_attempts: u32,
    /// Base delay of the exponential backoff in milliseconds
    pub base_delay_ms: u64,
    /// Cap on any single delay in milliseconds
    pub max_delay_ms: u64,
    /// Store codes worth retrying (kebab-case)
    pub retry_on: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
            retry_on: RetryPolicy::DEFAULT_RETRY_ON
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
        }
    }
}

/// Access layer configuration loaded from `bazaar.toml`.
///
/// # Example
///
/// ```toml
/// create_policy = "reread"
/// scan_cap = 1000
/// max_batch_operations = 500
/// default_timeout_ms = 10000
///
/// [retry]
/// max_attempts = 5
/// base_delay_ms = 100
/// max_delay_ms = 5000
/// retry_on = ["aborted", "unavailable", "deadline-exceeded", "resource-exhausted"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Return policy of `create`
    pub create_policy: CreatePolicy,
    /// Maximum documents fetched by one approximate scan
    pub scan_cap: usize,
    /// Maximum operations per batch (further capped by the store)
    pub max_batch_operations: usize,
    /// Timeout applied to operations whose context has no deadline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    /// Retry settings for callers using `with_retry`
    pub retry: RetryConfig,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            create_policy: CreatePolicy::default(),
            scan_cap: 1000,
            max_batch_operations: 500,
            default_timeout_ms: None,
            retry: RetryConfig::default(),
        }
    }
}

impl AccessConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Bazaar access layer configuration
#
# What create() returns: "reread" (default) reads the stored document back,
# "echo" returns the input with id and timestamps without a read.
create_policy = "reread"

# Maximum documents fetched by one approximate scan (search / predicate
# filtering done in memory). Results past the cap are reported as truncated.
scan_cap = 1000

# Maximum operations per batch. The store's own limit applies on top.
max_batch_operations = 500

# Timeout for operations whose context carries no deadline (default: none).
# default_timeout_ms = 10000

# Retry settings used by with_retry(). Service methods never retry.
[retry]
max_attempts = 5
base_delay_ms = 100
max_delay_ms = 5000
retry_on = ["aborted", "unavailable", "deadline-exceeded", "resource-exhausted"]
"#
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AccessConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_cap == 0 {
            return Err(ConfigError::Invalid {
                key: "scan_cap",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_batch_operations == 0 {
            return Err(ConfigError::Invalid {
                key: "max_batch_operations",
                reason: "must be at least 1".into(),
            });
        }
        self.retry_policy().map(|_| ())
    }

    /// Timeout for contexts without a deadline
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    /// Build the retry policy described by `[retry]`
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.max_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(ConfigError::Invalid {
                key: "retry.base_delay_ms",
                reason: format!("{} exceeds max_delay_ms {}", retry.base_delay_ms, retry.max_delay_ms),
            });
        }
        let retry_on = retry
            .retry_on
            .iter()
            .map(|name| {
                StoreCode::parse(name).ok_or_else(|| ConfigError::Invalid {
                    key: "retry.retry_on",
                    reason: format!("unknown store code '{}'", name),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RetryPolicy {
            max_attempts: retry.max_attempts,
            base_delay: Duration::from_millis(retry.base_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            retry_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_toml_matches_default() {
        let parsed = AccessConfig::from_toml_str(AccessConfig::default_toml()).unwrap();
        assert_eq!(parsed, AccessConfig::default());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let parsed = AccessConfig::from_toml_str("").unwrap();
        assert_eq!(parsed.create_policy, CreatePolicy::Reread);
        assert_eq!(parsed.scan_cap, 1000);
        assert_eq!(parsed.max_batch_operations, 500);
        assert!(parsed.default_timeout().is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let parsed = AccessConfig::from_toml_str(
            r#"
create_policy = "echo"
scan_cap = 50
default_timeout_ms = 250

[retry]
max_attempts = 2
retry_on = ["aborted"]
"#,
        )
        .unwrap();

        assert_eq!(parsed.create_policy, CreatePolicy::Echo);
        assert_eq!(parsed.scan_cap, 50);
        assert_eq!(parsed.default_timeout(), Some(Duration::from_millis(250)));
        let policy = parsed.retry_policy().unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.retry_on, vec![StoreCode::Aborted]);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            AccessConfig::from_toml_str("scan_cap = 0"),
            Err(ConfigError::Invalid { key: "scan_cap", .. })
        ));
        assert!(matches!(
            AccessConfig::from_toml_str("[retry]\nretry_on = [\"sometimes\"]"),
            Err(ConfigError::Invalid { key: "retry.retry_on", .. })
        ));
        assert!(matches!(
            AccessConfig::from_toml_str("[retry]\nbase_delay_ms = 10\nmax_delay_ms = 1"),
            Err(ConfigError::Invalid { key: "retry.base_delay_ms", .. })
        ));
        assert!(matches!(
            AccessConfig::from_toml_str("create_policy = \"maybe\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_write_default_if_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        AccessConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());
        let loaded = AccessConfig::from_file(&path).unwrap();
        assert_eq!(loaded, AccessConfig::default());

        std::fs::write(&path, "scan_cap = 7\n").unwrap();
        AccessConfig::write_default_if_missing(&path).unwrap();
        assert_eq!(AccessConfig::from_file(&path).unwrap().scan_cap, 7);
    }

    #[test]
    fn test_write_to_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = AccessConfig {
            create_policy: CreatePolicy::Echo,
            default_timeout_ms: Some(1500),
            ..AccessConfig::default()
        };

        config.write_to_file(&path).unwrap();
        assert_eq!(AccessConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = AccessConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(matches!(Error::from(err), Error::Config(_)));
    }
}
