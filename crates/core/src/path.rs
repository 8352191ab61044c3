//! Hierarchical document addressing
//!
//! Paths alternate collection and document segments:
//!
//! ```text
//! listings                      (collection)
//! listings/abc                  (document)
//! listings/abc/bids             (subcollection)
//! listings/abc/bids/b1          (document in subcollection)
//! ```
//!
//! A collection path has an odd number of segments, a document path an even
//! number. Both order lexicographically by segment, which is also the
//! store's default document order.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::invalid_argument("path segment must not be empty"));
    }
    if segment.contains('/') {
        return Err(Error::invalid_argument(format!(
            "path segment '{}' must not contain '/'",
            segment
        )));
    }
    if segment == "." || segment == ".." {
        return Err(Error::invalid_argument(format!(
            "path segment '{}' is reserved",
            segment
        )));
    }
    if segment.starts_with("__") && segment.ends_with("__") {
        return Err(Error::invalid_argument(format!(
            "path segment '{}' matches the reserved __.*__ pattern",
            segment
        )));
    }
    Ok(())
}

/// Path of a collection (top-level or nested under a document)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Top-level collection
    pub fn root(collection_id: impl Into<String>) -> Result<Self> {
        let id = collection_id.into();
        validate_segment(&id)?;
        Ok(Self { segments: vec![id] })
    }

    /// Parse a slash-separated collection path
    pub fn parse(path: &str) -> Result<Self> {
        let segments = split(path)?;
        if segments.len() % 2 == 0 {
            return Err(Error::invalid_argument(format!(
                "'{}' is not a collection path",
                path
            )));
        }
        Ok(Self { segments })
    }

    /// Document within this collection
    pub fn doc(&self, id: impl Into<String>) -> Result<DocumentPath> {
        let id = id.into();
        validate_segment(&id)?;
        let mut segments = self.segments.clone();
        segments.push(id);
        Ok(DocumentPath { segments })
    }

    /// Last segment: the collection id
    pub fn collection_id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Owning document, `None` for top-level collections
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.segments.len() < 3 {
            return None;
        }
        Some(DocumentPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True if `doc` is a direct child of this collection
    pub fn contains(&self, doc: &DocumentPath) -> bool {
        doc.segments.len() == self.segments.len() + 1 && doc.segments.starts_with(&self.segments)
    }

    /// Path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Path of a single document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Parse a slash-separated document path
    pub fn parse(path: &str) -> Result<Self> {
        let segments = split(path)?;
        if segments.len() % 2 != 0 {
            return Err(Error::invalid_argument(format!(
                "'{}' is not a document path",
                path
            )));
        }
        Ok(Self { segments })
    }

    /// Document id (last segment)
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Collection holding this document
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// Id of the collection holding this document
    pub fn collection_id(&self) -> &str {
        &self.segments[self.segments.len() - 2]
    }

    /// Subcollection under this document
    pub fn collection(&self, collection_id: impl Into<String>) -> Result<CollectionPath> {
        let id = collection_id.into();
        validate_segment(&id)?;
        let mut segments = self.segments.clone();
        segments.push(id);
        Ok(CollectionPath { segments })
    }

    /// True if this document lives anywhere below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &DocumentPath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments.starts_with(&ancestor.segments)
    }

    /// Path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn split(path: &str) -> Result<Vec<String>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(Error::invalid_argument("path must not be empty"));
    }
    let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
    for segment in &segments {
        validate_segment(segment)?;
    }
    Ok(segments)
}
