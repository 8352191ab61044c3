//! Composite index declarations
//!
//! Queries touching a single field are always served. Queries that filter or
//! order on two or more distinct fields need a composite index covering them;
//! under [`IndexPolicy::Require`] the store rejects such queries with
//! `failed-precondition` until a matching index is declared.

use crate::query::StoreQuery;
use bazaar_core::StoreError;

/// Whether the store insists on composite indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    /// Serve every query
    #[default]
    Permissive,
    /// Reject multi-field queries without a declared index
    Require,
}

/// A declared composite index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Collection id the index applies to (any depth)
    pub collection_id: String,
    /// Indexed fields
    pub fields: Vec<String>,
}

impl IndexDefinition {
    /// Declare an index over `fields` of `collection_id`
    pub fn new<I, S>(collection_id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collection_id: collection_id.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// True if this index serves the query
    pub fn covers(&self, query: &StoreQuery) -> bool {
        self.collection_id == query.scope.collection_id()
            && query
                .fields_used()
                .iter()
                .all(|f| self.fields.iter().any(|i| i == f))
    }
}

/// Check a query against the declared indexes
pub(crate) fn check_query(
    policy: IndexPolicy,
    indexes: &[IndexDefinition],
    query: &StoreQuery,
) -> Result<(), StoreError> {
    if policy == IndexPolicy::Permissive {
        return Ok(());
    }
    let fields = query.fields_used();
    if fields.len() < 2 || indexes.iter().any(|i| i.covers(query)) {
        return Ok(());
    }
    Err(StoreError::failed_precondition(format!(
        "The query requires an index on collection '{}' over fields [{}]",
        query.scope.collection_id(),
        fields.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativeValue;
    use crate::query::FieldFilter;
    use bazaar_core::{CollectionPath, Direction, FilterOp, StoreCode};

    fn two_field_query() -> StoreQuery {
        StoreQuery::collection(CollectionPath::root("listings").unwrap())
            .filter(FieldFilter::new(
                "status",
                FilterOp::Eq,
                NativeValue::String("open".into()),
            ))
            .order_by("price", Direction::Descending)
    }

    #[test]
    fn test_permissive_serves_everything() {
        assert!(check_query(IndexPolicy::Permissive, &[], &two_field_query()).is_ok());
    }

    #[test]
    fn test_require_rejects_uncovered_query() {
        let err = check_query(IndexPolicy::Require, &[], &two_field_query()).unwrap_err();
        assert_eq!(err.code, StoreCode::FailedPrecondition);
        assert!(err.message.contains("status"));
    }

    #[test]
    fn test_require_accepts_declared_index() {
        let index = IndexDefinition::new("listings", ["price", "status"]);
        assert!(check_query(IndexPolicy::Require, &[index], &two_field_query()).is_ok());

        let other = IndexDefinition::new("orders", ["price", "status"]);
        assert!(check_query(IndexPolicy::Require, &[other], &two_field_query()).is_err());
    }

    #[test]
    fn test_single_field_needs_no_index() {
        let query = StoreQuery::collection(CollectionPath::root("listings").unwrap())
            .order_by("price", Direction::Ascending);
        assert!(check_query(IndexPolicy::Require, &[], &query).is_ok());
    }
}
