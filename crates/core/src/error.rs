//! Error types for the access layer
//!
//! Two levels:
//! - [`StoreError`]: a failure reported by the document store, carrying the
//!   store's own [`StoreCode`]. The access layer propagates these unmodified.
//! - [`Error`]: everything an access-layer operation can fail with, including
//!   wrapped store errors.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::limits::LimitError;
use thiserror::Error;

/// Result type alias for access-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes reported by the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCode {
    /// The operation was cancelled by the caller
    Cancelled,
    /// Unknown error
    Unknown,
    /// Malformed request
    InvalidArgument,
    /// The store gave up waiting on the operation
    DeadlineExceeded,
    /// A document required by the request does not exist
    NotFound,
    /// A document the request tried to create already exists
    AlreadyExists,
    /// Caller lacks permission
    PermissionDenied,
    /// Quota or rate limit exhausted
    ResourceExhausted,
    /// The store is not in a state to run the request (e.g. missing index)
    FailedPrecondition,
    /// Concurrency conflict; the transaction was aborted
    Aborted,
    /// Value outside the valid range
    OutOfRange,
    /// Operation not supported by this store
    Unimplemented,
    /// Internal store invariant broken
    Internal,
    /// The store is temporarily unreachable
    Unavailable,
    /// Unrecoverable data loss
    DataLoss,
    /// Missing or invalid credentials
    Unauthenticated,
}

impl StoreCode {
    /// Canonical kebab-case name of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreCode::Cancelled => "cancelled",
            StoreCode::Unknown => "unknown",
            StoreCode::InvalidArgument => "invalid-argument",
            StoreCode::DeadlineExceeded => "deadline-exceeded",
            StoreCode::NotFound => "not-found",
            StoreCode::AlreadyExists => "already-exists",
            StoreCode::PermissionDenied => "permission-denied",
            StoreCode::ResourceExhausted => "resource-exhausted",
            StoreCode::FailedPrecondition => "failed-precondition",
            StoreCode::Aborted => "aborted",
            StoreCode::OutOfRange => "out-of-range",
            StoreCode::Unimplemented => "unimplemented",
            StoreCode::Internal => "internal",
            StoreCode::Unavailable => "unavailable",
            StoreCode::DataLoss => "data-loss",
            StoreCode::Unauthenticated => "unauthenticated",
        }
    }

    /// Parse a kebab-case code name
    pub fn parse(s: &str) -> Option<Self> {
        let code = match s {
            "cancelled" => StoreCode::Cancelled,
            "unknown" => StoreCode::Unknown,
            "invalid-argument" => StoreCode::InvalidArgument,
            "deadline-exceeded" => StoreCode::DeadlineExceeded,
            "not-found" => StoreCode::NotFound,
            "already-exists" => StoreCode::AlreadyExists,
            "permission-denied" => StoreCode::PermissionDenied,
            "resource-exhausted" => StoreCode::ResourceExhausted,
            "failed-precondition" => StoreCode::FailedPrecondition,
            "aborted" => StoreCode::Aborted,
            "out-of-range" => StoreCode::OutOfRange,
            "unimplemented" => StoreCode::Unimplemented,
            "internal" => StoreCode::Internal,
            "unavailable" => StoreCode::Unavailable,
            "data-loss" => StoreCode::DataLoss,
            "unauthenticated" => StoreCode::Unauthenticated,
            _ => return None,
        };
        Some(code)
    }
}

impl std::fmt::Display for StoreCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by the document store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct StoreError {
    /// Store-native error code
    pub code: StoreCode,
    /// Human-readable detail from the store
    pub message: String,
}

impl StoreError {
    /// Create a store error
    pub fn new(code: StoreCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Transaction aborted by a concurrency conflict
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(StoreCode::Aborted, message)
    }

    /// Required document missing
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreCode::NotFound, message)
    }

    /// Malformed request
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StoreCode::InvalidArgument, message)
    }

    /// Store precondition unmet
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(StoreCode::FailedPrecondition, message)
    }

    /// Store temporarily unreachable
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreCode::Unavailable, message)
    }
}

/// Error types for access-layer operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Target document does not exist (raised before any write is attempted)
    #[error("Document not found: {path}")]
    NotFound {
        /// Full path of the missing document
        path: String,
    },

    /// Failure reported by the store, propagated unmodified
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A stored field could not be decoded into the requested record type
    #[error("Cannot decode field '{field}': expected {expected}, found {found}")]
    Decode {
        /// Field name
        field: String,
        /// Expected value type
        expected: &'static str,
        /// Actual value type (or "missing")
        found: &'static str,
    },

    /// Request rejected by the access layer before reaching the store
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Batch exceeds the store's per-commit operation limit
    #[error("Batch of {len} operations exceeds the limit of {max}")]
    BatchTooLarge {
        /// Number of operations requested
        len: usize,
        /// Maximum allowed per commit
        max: usize,
    },

    /// Operation cancelled through its context
    #[error("Operation cancelled")]
    Cancelled,

    /// Operation deadline elapsed
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a not found error for a document path
    pub fn not_found(path: impl std::fmt::Display) -> Self {
        Error::NotFound {
            path: path.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Store code, if this error came from the store
    pub fn store_code(&self) -> Option<StoreCode> {
        match self {
            Error::Store(e) => Some(e.code),
            _ => None,
        }
    }

    /// True for "document not found", from either the layer or the store
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. }) || self.store_code() == Some(StoreCode::NotFound)
    }
}

impl From<LimitError> for Error {
    fn from(e: LimitError) -> Self {
        match e {
            LimitError::BatchTooLarge { actual, max } => Error::BatchTooLarge { len: actual, max },
            other => Error::InvalidArgument(other.to_string()),
        }
    }
}
