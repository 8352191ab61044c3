//! Core types for the Bazaar document access layer
//!
//! This crate defines the vocabulary shared by the store contract and the
//! access services:
//! - Value: application-level tagged value (dates included)
//! - Timestamp: the store's native nanosecond timestamp
//! - CollectionPath / DocumentPath: hierarchical addressing
//! - FilterOp / Direction: query operators understood by the store
//! - Error, StoreError, StoreCode: error hierarchy
//! - Limits: store-imposed size limits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod path;
pub mod query;
pub mod timestamp;
pub mod value;

pub use error::{Error, Result, StoreCode, StoreError};
pub use limits::{LimitError, Limits};
pub use path::{CollectionPath, DocumentPath};
pub use query::{Direction, FilterOp};
pub use timestamp::Timestamp;
pub use value::{Fields, Value};

/// Reserved field name holding the creation time of a document.
pub const CREATED_AT: &str = "createdAt";

/// Reserved field name holding the last mutation time of a document.
pub const UPDATED_AT: &str = "updatedAt";

/// Build a [`Fields`] map from `key => value` pairs.
///
/// ```
/// use bazaar_core::{fields, Value};
///
/// let f = fields! { "name" => "Foo", "value" => 1 };
/// assert_eq!(f.get("value"), Some(&Value::Int(1)));
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::Fields::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Fields::new();
        $( map.insert(::std::string::String::from($key), $crate::Value::from($value)); )+
        map
    }};
}
