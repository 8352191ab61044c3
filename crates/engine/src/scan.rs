//! Approximate scan: bounded in-memory search and filtering
//!
//! The store has no full-text search and only indexed filters. A scan fetches
//! at most `scan_cap` documents with the request's server-side filters and
//! ordering, then applies a case-insensitive substring search, an optional
//! predicate, and page slicing in memory. When the cap is reached the page
//! is flagged `truncated`: matches beyond the scanned window are not seen.

use crate::codec::decode_fields;
use crate::collection::CollectionService;
use crate::context::OpContext;
use crate::document::Document;
use crate::query::QueryOptions;
use crate::record::Record;
use bazaar_core::{Error, Fields, Result, Value};
use bazaar_storage::StoreQuery;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

type Predicate<T> = Arc<dyn Fn(&Document<T>) -> bool + Send + Sync>;

/// Parameters of an approximate scan
pub struct ScanRequest<T> {
    /// Server-side filters and ordering; the limit is replaced by the cap
    pub options: QueryOptions,
    /// Search text matched case-insensitively as a substring
    pub search: Option<String>,
    /// Fields searched; string and string-array values are considered
    pub search_fields: Vec<String>,
    /// Extra in-memory filter
    pub predicate: Option<Predicate<T>>,
    /// 1-based page number
    pub page: usize,
    /// Documents per page
    pub page_size: usize,
}

impl<T> Clone for ScanRequest<T> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            search: self.search.clone(),
            search_fields: self.search_fields.clone(),
            predicate: self.predicate.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }
}

impl<T> fmt::Debug for ScanRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRequest")
            .field("options", &self.options)
            .field("search", &self.search)
            .field("search_fields", &self.search_fields)
            .field("predicate", &self.predicate.is_some())
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl<T> Default for ScanRequest<T> {
    fn default() -> Self {
        Self {
            options: QueryOptions::default(),
            search: None,
            search_fields: Vec::new(),
            predicate: None,
            page: 1,
            page_size: 20,
        }
    }
}

impl<T> ScanRequest<T> {
    /// Scan every document, first page of 20
    pub fn new() -> Self {
        Self::default()
    }

    /// Server-side filters and ordering
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Search `text` in `fields`
    pub fn search<I, S>(mut self, text: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = Some(text.into());
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Keep only documents accepted by `predicate`
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Document<T>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Select a page
    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

/// One page of scan results
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage<T> {
    /// Documents of the requested page
    pub data: Vec<Document<T>>,
    /// Matches within the scanned window
    pub total: usize,
    /// Documents fetched from the store
    pub scanned: usize,
    /// The cap was reached; matches past it were not considered
    pub truncated: bool,
    /// Page number returned
    pub page: usize,
    /// Page size used
    pub page_size: usize,
    /// More matches exist after this page within the window
    pub has_more: bool,
}

fn matches_search(fields: &Fields, needle: &str, search_fields: &[String]) -> bool {
    search_fields.iter().any(|name| match fields.get(name) {
        Some(Value::String(s)) => s.to_lowercase().contains(needle),
        Some(Value::Array(items)) => items.iter().any(|item| {
            item.as_str()
                .map(|s| s.to_lowercase().contains(needle))
                .unwrap_or(false)
        }),
        _ => false,
    })
}

impl<T: Record> CollectionService<T> {
    /// Approximate scan over at most `scan_cap` documents
    ///
    /// `total` counts matches inside the scanned window only; check
    /// `truncated` before presenting it as exact.
    pub async fn scan(&self, ctx: &OpContext, request: &ScanRequest<T>) -> Result<ScanPage<T>> {
        if request.page == 0 || request.page_size == 0 {
            return Err(Error::invalid_argument("page and page_size must be at least 1"));
        }
        let ctx = self.client().prepare(ctx);
        let cap = self.client().config().scan_cap;

        let query = request
            .options
            .apply_unlimited(StoreQuery::collection(self.path().clone()), self.client().limits())?
            .limit(cap);
        let snapshots = ctx.call(self.client().store().run_query(&query)).await?;
        let scanned = snapshots.len();
        let truncated = scanned >= cap;
        if truncated {
            warn!(
                target: "bazaar::scan",
                collection = %self.path(),
                cap,
                "Scan reached its cap; results may be incomplete"
            );
        }

        let needle = request
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matched = Vec::new();
        for snapshot in &snapshots {
            if let Some(needle) = &needle {
                let fields = decode_fields(&snapshot.fields);
                if !matches_search(&fields, needle, &request.search_fields) {
                    continue;
                }
            }
            let doc = Document::<T>::from_snapshot(snapshot)?;
            if let Some(predicate) = &request.predicate {
                if !predicate(&doc) {
                    continue;
                }
            }
            matched.push(doc);
        }

        let total = matched.len();
        let start = (request.page - 1).saturating_mul(request.page_size);
        let data: Vec<Document<T>> = matched
            .into_iter()
            .skip(start)
            .take(request.page_size)
            .collect();
        let has_more = start.saturating_add(data.len()) < total;

        Ok(ScanPage {
            data,
            total,
            scanned,
            truncated,
            page: request.page,
            page_size: request.page_size,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::fields;

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let f = fields! {
            "title" => "Walnut Dining Table",
            "tags" => vec!["Mid-Century".to_string(), "wood".to_string()],
            "price" => 300,
        };
        let title = vec!["title".to_string()];
        let tags = vec!["tags".to_string()];

        assert!(matches_search(&f, "dining", &title));
        assert!(!matches_search(&f, "chair", &title));
        assert!(matches_search(&f, "century", &tags));
        assert!(!matches_search(&f, "300", &["price".to_string()]));
    }

    #[test]
    fn test_request_builder() {
        let request = ScanRequest::<Fields>::new()
            .search("oak", ["title", "description"])
            .filter(|d| d.contains_key("price"))
            .page(2, 10);
        assert_eq!(request.search.as_deref(), Some("oak"));
        assert_eq!(request.search_fields, vec!["title", "description"]);
        assert!(request.predicate.is_some());
        assert_eq!((request.page, request.page_size), (2, 10));
    }
}
