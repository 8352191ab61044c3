//! Query options and paginated results

use crate::codec::encode;
use crate::document::Document;
use bazaar_core::{Direction, Error, FilterOp, Limits, Result, Value};
use bazaar_storage::{DocumentSnapshot, FieldFilter, StoreQuery};

/// One conjunctive filter
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    /// Field name, possibly dotted
    pub field: String,
    /// Operator
    pub op: FilterOp,
    /// Operand; an array for `in` and `array-contains-any`
    pub value: Value,
}

impl WhereClause {
    /// Create a filter
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Check operand shape and list limits, then encode
    fn to_store(&self, limits: &Limits) -> Result<FieldFilter> {
        if self.op.takes_list() {
            let values = self.value.as_array().ok_or_else(|| {
                Error::invalid_argument(format!(
                    "'{}' filter on '{}' needs an array operand, got {}",
                    self.op,
                    self.field,
                    self.value.type_name()
                ))
            })?;
            limits.validate_in_values(values.len())?;
        }
        Ok(FieldFilter::new(
            self.field.clone(),
            self.op,
            encode(&self.value),
        ))
    }
}

/// One ordering clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByClause {
    /// Field name, possibly dotted
    pub field: String,
    /// Direction
    pub direction: Direction,
}

impl OrderByClause {
    /// Create an ordering clause
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Opaque position in a result set
///
/// Wraps the store snapshot of a document; the store positions the next
/// page by that document's order-by values.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor(pub(crate) DocumentSnapshot);

impl Cursor {
    /// Cursor positioned at a snapshot
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Self {
        Cursor(snapshot)
    }

    /// Id of the document the cursor points at
    pub fn id(&self) -> &str {
        self.0.id()
    }

    /// Underlying snapshot
    pub fn snapshot(&self) -> &DocumentSnapshot {
        &self.0
    }
}

/// Filters, ordering, cursors and limit of a query
///
/// Applied in a fixed order: filters, then ordering, then cursors
/// (start-after, start-at, end-before, end-at; a later start or end
/// directive replaces an earlier one), then limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Conjunctive filters
    pub where_clauses: Vec<WhereClause>,
    /// Ordering
    pub order_by: Vec<OrderByClause>,
    /// Maximum results (page size for paginated queries)
    pub limit: Option<usize>,
    /// Start after this document
    pub start_after: Option<Cursor>,
    /// Start at this document
    pub start_at: Option<Cursor>,
    /// End before this document
    pub end_before: Option<Cursor>,
    /// End at this document
    pub end_at: Option<Cursor>,
    /// Also count all matches (paginated queries only)
    pub with_total: bool,
}

impl QueryOptions {
    /// Empty options: every document, id order
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.where_clauses.push(WhereClause::new(field, op, value));
        self
    }

    /// Add an equality filter
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    /// Add an ordering clause
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderByClause::new(field, direction));
        self
    }

    /// Cap the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Start after a cursor
    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Start at a cursor
    pub fn start_at(mut self, cursor: Cursor) -> Self {
        self.start_at = Some(cursor);
        self
    }

    /// End before a cursor
    pub fn end_before(mut self, cursor: Cursor) -> Self {
        self.end_before = Some(cursor);
        self
    }

    /// End at a cursor
    pub fn end_at(mut self, cursor: Cursor) -> Self {
        self.end_at = Some(cursor);
        self
    }

    /// Request a total count alongside a page
    pub fn with_total(mut self) -> Self {
        self.with_total = true;
        self
    }

    /// Apply filters to a base query
    pub(crate) fn apply_filters(&self, mut query: StoreQuery, limits: &Limits) -> Result<StoreQuery> {
        for clause in &self.where_clauses {
            query = query.filter(clause.to_store(limits)?);
        }
        Ok(query)
    }

    /// Apply everything except the limit
    pub(crate) fn apply_unlimited(&self, query: StoreQuery, limits: &Limits) -> Result<StoreQuery> {
        let mut query = self.apply_filters(query, limits)?;
        for order in &self.order_by {
            query = query.order_by(order.field.clone(), order.direction);
        }
        if let Some(cursor) = &self.start_after {
            query = query.start_after(cursor.0.clone());
        }
        if let Some(cursor) = &self.start_at {
            query = query.start_at(cursor.0.clone());
        }
        if let Some(cursor) = &self.end_before {
            query = query.end_before(cursor.0.clone());
        }
        if let Some(cursor) = &self.end_at {
            query = query.end_at(cursor.0.clone());
        }
        Ok(query)
    }

    /// Apply every directive to a base query
    pub(crate) fn apply(&self, query: StoreQuery, limits: &Limits) -> Result<StoreQuery> {
        let query = self.apply_unlimited(query, limits)?;
        Ok(match self.limit {
            Some(limit) => query.limit(limit),
            None => query,
        })
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    /// Documents of this page
    pub data: Vec<Document<T>>,
    /// More documents follow this page
    pub has_more: bool,
    /// Position of the last document, for `start_after` on the next page
    pub cursor: Option<Cursor>,
    /// Total matches, when requested
    pub total: Option<u64>,
}
