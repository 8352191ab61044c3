//! Read documents

use crate::native::{get_field, NativeMap, NativeValue};
use bazaar_core::{DocumentPath, Timestamp};

/// A document as read from the store at one point in time
///
/// Snapshots double as query cursors: the store positions a cursor by the
/// snapshot's values for the query's order-by fields plus its path.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// Full document path
    pub path: DocumentPath,
    /// Stored fields
    pub fields: NativeMap,
    /// When the document was first created
    pub create_time: Timestamp,
    /// When the document was last written
    pub update_time: Timestamp,
    /// Commit version of the last write (used for conflict detection)
    pub version: u64,
}

impl DocumentSnapshot {
    /// Document id (last path segment)
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Look up a possibly dotted field
    pub fn get(&self, field: &str) -> Option<&NativeValue> {
        get_field(&self.fields, field)
    }
}
