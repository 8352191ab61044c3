//! Writes applied by an atomic commit

use crate::native::NativeMap;
use bazaar_core::DocumentPath;

/// One mutation inside a commit
///
/// A commit applies every write or none of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or overwrite a document
    Set {
        /// Target document
        path: DocumentPath,
        /// Fields to write
        fields: NativeMap,
        /// Merge into the existing document instead of replacing it
        merge: bool,
    },
    /// Patch an existing document; fails with `not-found` if it is absent
    Update {
        /// Target document
        path: DocumentPath,
        /// Field values keyed by (possibly dotted) field path
        fields: NativeMap,
    },
    /// Remove a document; succeeds if it is already absent
    Delete {
        /// Target document
        path: DocumentPath,
    },
}

impl Write {
    /// Full overwrite
    pub fn set(path: DocumentPath, fields: NativeMap) -> Self {
        Write::Set {
            path,
            fields,
            merge: false,
        }
    }

    /// Merge write (creates the document if absent)
    pub fn merge(path: DocumentPath, fields: NativeMap) -> Self {
        Write::Set {
            path,
            fields,
            merge: true,
        }
    }

    /// Patch of an existing document
    pub fn update(path: DocumentPath, fields: NativeMap) -> Self {
        Write::Update { path, fields }
    }

    /// Delete
    pub fn delete(path: DocumentPath) -> Self {
        Write::Delete { path }
    }

    /// Target document path
    pub fn path(&self) -> &DocumentPath {
        match self {
            Write::Set { path, .. } | Write::Update { path, .. } | Write::Delete { path } => path,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Write::Set { merge: false, .. } => "set",
            Write::Set { merge: true, .. } => "merge",
            Write::Update { .. } => "update",
            Write::Delete { .. } => "delete",
        }
    }
}
