//! Store query model and evaluation
//!
//! A query runs in this order, matching the store:
//! 1. scope (one collection, or every collection with a given id)
//! 2. filters, conjunctive
//! 3. ordering: explicit order-by fields, then document path as tiebreak
//!    in the direction of the last explicit field
//! 4. start / end bounds positioned by a snapshot's order-by values
//! 5. limit
//!
//! Documents lacking an explicit order-by field are excluded, as the store
//! only indexes documents that contain the ordered field.

use crate::native::{get_field, NativeValue};
use crate::snapshot::DocumentSnapshot;
use bazaar_core::{CollectionPath, Direction, DocumentPath, FilterOp};
use std::borrow::Cow;
use std::cmp::Ordering;

/// Pseudo-field addressing the document path in filters and order-by
pub const DOCUMENT_ID_FIELD: &str = "__name__";

/// Which documents a query ranges over
#[derive(Debug, Clone, PartialEq)]
pub enum QueryScope {
    /// Direct children of one collection
    Collection(CollectionPath),
    /// Every collection with this id, at any depth
    CollectionGroup(String),
}

impl QueryScope {
    /// True if `path` falls inside this scope
    pub fn contains(&self, path: &DocumentPath) -> bool {
        match self {
            QueryScope::Collection(collection) => collection.contains(path),
            QueryScope::CollectionGroup(id) => path.collection_id() == id,
        }
    }

    /// Collection id the scope targets
    pub fn collection_id(&self) -> &str {
        match self {
            QueryScope::Collection(collection) => collection.collection_id(),
            QueryScope::CollectionGroup(id) => id,
        }
    }
}

/// A single where clause in store-native form
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Field name, possibly dotted
    pub field: String,
    /// Operator
    pub op: FilterOp,
    /// Operand; an `Array` for list operators
    pub value: NativeValue,
}

impl FieldFilter {
    /// Create a filter
    pub fn new(field: impl Into<String>, op: FilterOp, value: NativeValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Check if a document matches this filter
    pub fn matches(&self, doc: &DocumentSnapshot) -> bool {
        let field_value = match field_value(doc, &self.field) {
            Some(v) => v,
            None => return false,
        };
        let field_value = field_value.as_ref();

        match self.op {
            FilterOp::Eq => field_value.store_eq(&self.value),
            FilterOp::NotEq => {
                !matches!(field_value, NativeValue::Null) && !field_value.store_eq(&self.value)
            }
            FilterOp::Lt => range_cmp(field_value, &self.value) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                range_cmp(field_value, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => range_cmp(field_value, &self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                range_cmp(field_value, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::In => match &self.value {
                NativeValue::Array(candidates) => {
                    candidates.iter().any(|c| field_value.store_eq(c))
                }
                _ => false,
            },
            FilterOp::ArrayContains => match field_value {
                NativeValue::Array(items) => items.iter().any(|i| i.store_eq(&self.value)),
                _ => false,
            },
            FilterOp::ArrayContainsAny => match (field_value, &self.value) {
                (NativeValue::Array(items), NativeValue::Array(candidates)) => items
                    .iter()
                    .any(|i| candidates.iter().any(|c| i.store_eq(c))),
                _ => false,
            },
        }
    }
}

/// Range comparison only holds within one type family
fn range_cmp(a: &NativeValue, b: &NativeValue) -> Option<Ordering> {
    if a.same_type_family(b) {
        Some(a.store_cmp(b))
    } else {
        None
    }
}

fn field_value<'a>(doc: &'a DocumentSnapshot, field: &str) -> Option<Cow<'a, NativeValue>> {
    if field == DOCUMENT_ID_FIELD {
        return Some(Cow::Owned(NativeValue::String(doc.path.to_string())));
    }
    get_field(&doc.fields, field).map(Cow::Borrowed)
}

/// A single order-by clause
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOrder {
    /// Field name, possibly dotted
    pub field: String,
    /// Sort direction
    pub direction: Direction,
}

impl FieldOrder {
    /// Create an order-by clause
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Start or end position taken from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// Document whose position anchors the bound
    pub snapshot: DocumentSnapshot,
    /// Whether the anchor document itself is included
    pub inclusive: bool,
}

/// Query over one collection or a collection group
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    /// Documents in range
    pub scope: QueryScope,
    /// Conjunctive filters
    pub filters: Vec<FieldFilter>,
    /// Explicit ordering
    pub order_by: Vec<FieldOrder>,
    /// Start bound
    pub start: Option<Bound>,
    /// End bound
    pub end: Option<Bound>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl StoreQuery {
    /// Query over one collection
    pub fn collection(path: CollectionPath) -> Self {
        Self::with_scope(QueryScope::Collection(path))
    }

    /// Query over every collection with `collection_id`
    pub fn collection_group(collection_id: impl Into<String>) -> Self {
        Self::with_scope(QueryScope::CollectionGroup(collection_id.into()))
    }

    fn with_scope(scope: QueryScope) -> Self {
        Self {
            scope,
            filters: Vec::new(),
            order_by: Vec::new(),
            start: None,
            end: None,
            limit: None,
        }
    }

    /// Add a filter
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an order-by clause
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(FieldOrder::new(field, direction));
        self
    }

    /// Start at the snapshot (inclusive); replaces any earlier start bound
    pub fn start_at(mut self, snapshot: DocumentSnapshot) -> Self {
        self.start = Some(Bound {
            snapshot,
            inclusive: true,
        });
        self
    }

    /// Start after the snapshot (exclusive); replaces any earlier start bound
    pub fn start_after(mut self, snapshot: DocumentSnapshot) -> Self {
        self.start = Some(Bound {
            snapshot,
            inclusive: false,
        });
        self
    }

    /// End at the snapshot (inclusive); replaces any earlier end bound
    pub fn end_at(mut self, snapshot: DocumentSnapshot) -> Self {
        self.end = Some(Bound {
            snapshot,
            inclusive: true,
        });
        self
    }

    /// End before the snapshot (exclusive); replaces any earlier end bound
    pub fn end_before(mut self, snapshot: DocumentSnapshot) -> Self {
        self.end = Some(Bound {
            snapshot,
            inclusive: false,
        });
        self
    }

    /// Cap the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Distinct non-pseudo fields the query filters or orders on
    pub fn fields_used(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let candidates = self
            .filters
            .iter()
            .map(|f| f.field.as_str())
            .chain(self.order_by.iter().map(|o| o.field.as_str()));
        for field in candidates {
            if field != DOCUMENT_ID_FIELD && !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    /// Compare two documents in this query's result order
    pub fn compare(&self, a: &DocumentSnapshot, b: &DocumentSnapshot) -> Ordering {
        for order in &self.order_by {
            let va = field_value(a, &order.field);
            let vb = field_value(b, &order.field);
            let ord = match (va, vb) {
                (Some(x), Some(y)) => x.store_cmp(&y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ord = order.direction.apply(ord);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        let tiebreak = self
            .order_by
            .last()
            .map(|o| o.direction)
            .unwrap_or_default();
        tiebreak.apply(a.path.cmp(&b.path))
    }

    fn after_start(&self, doc: &DocumentSnapshot) -> bool {
        match &self.start {
            None => true,
            Some(bound) => match self.compare(doc, &bound.snapshot) {
                Ordering::Greater => true,
                Ordering::Equal => bound.inclusive,
                Ordering::Less => false,
            },
        }
    }

    fn before_end(&self, doc: &DocumentSnapshot) -> bool {
        match &self.end {
            None => true,
            Some(bound) => match self.compare(doc, &bound.snapshot) {
                Ordering::Less => true,
                Ordering::Equal => bound.inclusive,
                Ordering::Greater => false,
            },
        }
    }

    /// True if the document passes scope, order-by presence, and filters
    pub fn matches(&self, doc: &DocumentSnapshot) -> bool {
        self.scope.contains(&doc.path)
            && self
                .order_by
                .iter()
                .all(|o| field_value(doc, &o.field).is_some())
            && self.filters.iter().all(|f| f.matches(doc))
    }

    /// Run the query over a set of candidate documents
    pub fn evaluate<I>(&self, docs: I) -> Vec<DocumentSnapshot>
    where
        I: IntoIterator<Item = DocumentSnapshot>,
    {
        let mut results: Vec<DocumentSnapshot> =
            docs.into_iter().filter(|d| self.matches(d)).collect();
        results.sort_by(|a, b| self.compare(a, b));
        let bounded = results
            .into_iter()
            .filter(|d| self.after_start(d) && self.before_end(d));
        match self.limit {
            Some(limit) => bounded.take(limit).collect(),
            None => bounded.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativeMap;
    use bazaar_core::Timestamp;

    fn doc(path: &str, fields: &[(&str, NativeValue)]) -> DocumentSnapshot {
        DocumentSnapshot {
            path: DocumentPath::parse(path).unwrap(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<NativeMap>(),
            create_time: Timestamp::EPOCH,
            update_time: Timestamp::EPOCH,
            version: 1,
        }
    }

    fn int(i: i64) -> NativeValue {
        NativeValue::Integer(i)
    }

    fn listings() -> StoreQuery {
        StoreQuery::collection(CollectionPath::root("listings").unwrap())
    }

    fn ids(docs: &[DocumentSnapshot]) -> Vec<&str> {
        docs.iter().map(|d| d.id()).collect()
    }

    fn sample() -> Vec<DocumentSnapshot> {
        vec![
            doc("listings/a", &[("price", int(30)), ("tags", NativeValue::Array(vec![NativeValue::String("oak".into())]))]),
            doc("listings/b", &[("price", int(10))]),
            doc("listings/c", &[("price", int(20)), ("tags", NativeValue::Array(vec![NativeValue::String("pine".into())]))]),
            doc("listings/d", &[("status", NativeValue::Null)]),
            doc("other/x", &[("price", int(5))]),
        ]
    }

    #[test]
    fn test_scope_filters_collection() {
        let results = listings().evaluate(sample());
        assert_eq!(ids(&results), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_order_and_limit() {
        let results = listings()
            .order_by("price", Direction::Descending)
            .limit(2)
            .evaluate(sample());
        assert_eq!(ids(&results), vec!["a", "c"]);
    }

    #[test]
    fn test_missing_order_field_excluded() {
        let results = listings().order_by("price", Direction::Ascending).evaluate(sample());
        assert_eq!(ids(&results), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_range_filter_same_type_only() {
        let results = listings()
            .filter(FieldFilter::new("price", FilterOp::Gte, int(20)))
            .evaluate(sample());
        assert_eq!(ids(&results), vec!["a", "c"]);

        let results = listings()
            .filter(FieldFilter::new("price", FilterOp::Gt, NativeValue::String("0".into())))
            .evaluate(sample());
        assert!(results.is_empty());
    }

    #[test]
    fn test_not_equal_excludes_missing_and_null() {
        let results = listings()
            .filter(FieldFilter::new("status", FilterOp::NotEq, NativeValue::String("sold".into())))
            .evaluate(sample());
        assert!(results.is_empty());
    }

    #[test]
    fn test_in_and_array_operators() {
        let results = listings()
            .filter(FieldFilter::new("price", FilterOp::In, NativeValue::Array(vec![int(10), int(30)])))
            .evaluate(sample());
        assert_eq!(ids(&results), vec!["a", "b"]);

        let results = listings()
            .filter(FieldFilter::new("tags", FilterOp::ArrayContains, NativeValue::String("pine".into())))
            .evaluate(sample());
        assert_eq!(ids(&results), vec!["c"]);

        let results = listings()
            .filter(FieldFilter::new(
                "tags",
                FilterOp::ArrayContainsAny,
                NativeValue::Array(vec![NativeValue::String("oak".into()), NativeValue::String("pine".into())]),
            ))
            .evaluate(sample());
        assert_eq!(ids(&results), vec!["a", "c"]);
    }

    #[test]
    fn test_cursor_bounds() {
        let docs = sample();
        let c = docs[2].clone();
        let base = listings().order_by("price", Direction::Ascending);

        let after = base.clone().start_after(c.clone()).evaluate(docs.clone());
        assert_eq!(ids(&after), vec!["a"]);

        let at = base.clone().start_at(c.clone()).evaluate(docs.clone());
        assert_eq!(ids(&at), vec!["c", "a"]);

        let before = base.clone().end_before(c.clone()).evaluate(docs.clone());
        assert_eq!(ids(&before), vec!["b"]);

        let end_at = base.end_at(c).evaluate(docs);
        assert_eq!(ids(&end_at), vec!["b", "c"]);
    }

    #[test]
    fn test_later_start_bound_replaces_earlier() {
        let docs = sample();
        let q = listings()
            .order_by("price", Direction::Ascending)
            .start_after(docs[2].clone())
            .start_at(docs[1].clone());
        assert_eq!(ids(&q.evaluate(docs)), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_collection_group_scope() {
        let docs = vec![
            doc("listings/a/bids/1", &[("amount", int(5))]),
            doc("listings/b/bids/2", &[("amount", int(7))]),
            doc("bids/3", &[("amount", int(1))]),
            doc("listings/a/offers/4", &[("amount", int(9))]),
        ];
        let results = StoreQuery::collection_group("bids")
            .order_by("amount", Direction::Descending)
            .evaluate(docs);
        assert_eq!(ids(&results), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_fields_used_is_distinct() {
        let q = listings()
            .filter(FieldFilter::new("status", FilterOp::Eq, NativeValue::String("open".into())))
            .order_by("price", Direction::Ascending)
            .order_by("status", Direction::Ascending)
            .order_by(DOCUMENT_ID_FIELD, Direction::Ascending);
        assert_eq!(q.fields_used(), vec!["status", "price"]);
    }
}
