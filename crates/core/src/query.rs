//! Query operators understood by the document store

use serde::{Deserialize, Serialize};

/// Comparison operator of a where clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    /// Equals
    #[serde(rename = "==")]
    Eq,
    /// Not equals (documents lacking the field never match)
    #[serde(rename = "!=")]
    NotEq,
    /// Less than
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal
    #[serde(rename = "<=")]
    Lte,
    /// Greater than
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal
    #[serde(rename = ">=")]
    Gte,
    /// Field equals one of a list of values
    #[serde(rename = "in")]
    In,
    /// Array field contains the value
    #[serde(rename = "array-contains")]
    ArrayContains,
    /// Array field contains any of a list of values
    #[serde(rename = "array-contains-any")]
    ArrayContainsAny,
}

impl FilterOp {
    /// Operator as written in query syntax
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::NotEq => "!=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::In => "in",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::ArrayContainsAny => "array-contains-any",
        }
    }

    /// True for operators that take a list of values
    pub fn takes_list(&self) -> bool {
        matches!(self, FilterOp::In | FilterOp::ArrayContainsAny)
    }

    /// True for range and inequality operators
    pub fn is_inequality(&self) -> bool {
        matches!(
            self,
            FilterOp::NotEq | FilterOp::Lt | FilterOp::Lte | FilterOp::Gt | FilterOp::Gte
        )
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction of an order-by clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// Descending
    #[serde(rename = "desc")]
    Descending,
}

impl Direction {
    /// Apply this direction to an ascending comparison result
    pub fn apply(&self, ord: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}
