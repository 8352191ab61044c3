//! Read-set validation for optimistic transactions
//!
//! Rules:
//! - First committer wins, judged on the READ set only
//! - Blind writes (write without read) never conflict
//! - A document read as absent conflicts if it exists at commit time
//! - Write skew is allowed

use bazaar_core::DocumentPath;
use std::collections::HashMap;

/// Version recorded for a document that did not exist when read
pub const ABSENT_VERSION: u64 = 0;

/// Conflict detected at commit time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// Document was read at one version but is now at another
    ReadWriteConflict {
        /// Document that changed
        path: DocumentPath,
        /// Version recorded when read
        read_version: u64,
        /// Version at validation time
        current_version: u64,
    },
}

impl ConflictType {
    /// Document the conflict is about
    pub fn path(&self) -> &DocumentPath {
        match self {
            ConflictType::ReadWriteConflict { path, .. } => path,
        }
    }
}

/// Result of transaction validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// All conflicts detected
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Validation passed
    pub fn ok() -> Self {
        Self::default()
    }

    /// True if no conflicts were found
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Compare recorded read versions against current versions
///
/// `current_version` returns the live version of a document, or `None` if
/// it does not exist.
pub fn validate_read_set<F>(read_set: &HashMap<DocumentPath, u64>, current_version: F) -> ValidationResult
where
    F: Fn(&DocumentPath) -> Option<u64>,
{
    let mut result = ValidationResult::ok();

    for (path, read_version) in read_set {
        let current = current_version(path).unwrap_or(ABSENT_VERSION);
        if current != *read_version {
            result.conflicts.push(ConflictType::ReadWriteConflict {
                path: path.clone(),
                read_version: *read_version,
                current_version: current,
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> DocumentPath {
        DocumentPath::parse(s).unwrap()
    }

    #[test]
    fn test_unchanged_read_set_is_valid() {
        let mut read_set = HashMap::new();
        read_set.insert(path("accounts/a"), 3);
        read_set.insert(path("accounts/b"), ABSENT_VERSION);

        let result = validate_read_set(&read_set, |p| (p.id() == "a").then_some(3));
        assert!(result.is_valid());
    }

    #[test]
    fn test_changed_version_conflicts() {
        let mut read_set = HashMap::new();
        read_set.insert(path("accounts/a"), 3);

        let result = validate_read_set(&read_set, |_| Some(4));
        assert_eq!(result.conflict_count(), 1);
        assert_eq!(
            result.conflicts[0],
            ConflictType::ReadWriteConflict {
                path: path("accounts/a"),
                read_version: 3,
                current_version: 4,
            }
        );
    }

    #[test]
    fn test_deleted_or_created_since_read_conflicts() {
        let mut read_set = HashMap::new();
        read_set.insert(path("accounts/gone"), 2);
        read_set.insert(path("accounts/new"), ABSENT_VERSION);

        let result = validate_read_set(&read_set, |p| (p.id() == "new").then_some(7));
        assert_eq!(result.conflict_count(), 2);
    }

    #[test]
    fn test_empty_read_set_is_valid() {
        let result = validate_read_set(&HashMap::new(), |_| Some(1));
        assert!(result.is_valid());
    }
}
