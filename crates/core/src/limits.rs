//! Store-imposed limits
//!
//! These mirror hard limits of the document store. The access layer checks
//! the cheap ones before issuing a request so that an oversize batch or
//! filter fails without a round trip.

use crate::value::{Fields, Value};
use thiserror::Error;

/// Limits enforced on requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum writes per atomic commit (default: 500)
    pub max_batch_operations: usize,

    /// Maximum values in an `in` / `array-contains-any` list (default: 30)
    pub max_in_values: usize,

    /// Maximum map/array nesting depth of a field value (default: 20)
    pub max_nesting_depth: usize,

    /// Maximum field name length in bytes (default: 1500)
    pub max_field_name_bytes: usize,

    /// Maximum document id length in bytes (default: 1500)
    pub max_document_id_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_batch_operations: 500,
            max_in_values: 30,
            max_nesting_depth: 20,
            max_field_name_bytes: 1500,
            max_document_id_bytes: 1500,
        }
    }
}

impl Limits {
    /// Limits with small values for testing
    pub fn with_small_limits() -> Self {
        Limits {
            max_batch_operations: 5,
            max_in_values: 3,
            max_nesting_depth: 3,
            max_field_name_bytes: 64,
            max_document_id_bytes: 64,
        }
    }

    /// Validate the number of operations in one commit
    pub fn validate_batch_len(&self, len: usize) -> Result<(), LimitError> {
        if len > self.max_batch_operations {
            return Err(LimitError::BatchTooLarge {
                actual: len,
                max: self.max_batch_operations,
            });
        }
        Ok(())
    }

    /// Validate the size of a disjunctive value list
    pub fn validate_in_values(&self, len: usize) -> Result<(), LimitError> {
        if len == 0 {
            return Err(LimitError::EmptyValueList);
        }
        if len > self.max_in_values {
            return Err(LimitError::TooManyValues {
                actual: len,
                max: self.max_in_values,
            });
        }
        Ok(())
    }

    /// Validate a document id segment length
    pub fn validate_document_id(&self, id: &str) -> Result<(), LimitError> {
        if id.len() > self.max_document_id_bytes {
            return Err(LimitError::IdTooLong {
                actual: id.len(),
                max: self.max_document_id_bytes,
            });
        }
        Ok(())
    }

    /// Validate every field name and value depth of a document body
    pub fn validate_fields(&self, fields: &Fields) -> Result<(), LimitError> {
        for (name, value) in fields {
            if name.len() > self.max_field_name_bytes {
                return Err(LimitError::FieldNameTooLong {
                    actual: name.len(),
                    max: self.max_field_name_bytes,
                });
            }
            self.validate_value(value)?;
        }
        Ok(())
    }

    /// Validate the nesting depth of a single value
    pub fn validate_value(&self, value: &Value) -> Result<(), LimitError> {
        let depth = value.depth();
        if depth > self.max_nesting_depth {
            return Err(LimitError::NestingTooDeep {
                actual: depth,
                max: self.max_nesting_depth,
            });
        }
        Ok(())
    }
}

/// Limit validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitError {
    /// Too many writes in one commit
    #[error("batch has {actual} operations, max {max}")]
    BatchTooLarge {
        /// Actual count
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Disjunctive list too long
    #[error("filter lists {actual} values, max {max}")]
    TooManyValues {
        /// Actual count
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Disjunctive list empty
    #[error("filter value list must not be empty")]
    EmptyValueList,

    /// Document id too long
    #[error("document id is {actual} bytes, max {max}")]
    IdTooLong {
        /// Actual length
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Field name too long
    #[error("field name is {actual} bytes, max {max}")]
    FieldNameTooLong {
        /// Actual length
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Value nested too deeply
    #[error("value nesting depth {actual} exceeds max {max}")]
    NestingTooDeep {
        /// Actual depth
        actual: usize,
        /// Maximum allowed
        max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_batch_operations, 500);
        assert_eq!(limits.max_in_values, 30);
    }

    #[test]
    fn test_batch_len_boundary() {
        let limits = Limits::default();
        assert!(limits.validate_batch_len(500).is_ok());
        assert_eq!(
            limits.validate_batch_len(501),
            Err(LimitError::BatchTooLarge {
                actual: 501,
                max: 500
            })
        );
    }

    #[test]
    fn test_in_values() {
        let limits = Limits::with_small_limits();
        assert!(limits.validate_in_values(3).is_ok());
        assert!(matches!(
            limits.validate_in_values(4),
            Err(LimitError::TooManyValues { .. })
        ));
        assert_eq!(limits.validate_in_values(0), Err(LimitError::EmptyValueList));
    }

    #[test]
    fn test_nesting_depth() {
        let limits = Limits::with_small_limits();
        let shallow = fields! { "a" => Value::Array(vec![Value::Int(1)]) };
        assert!(limits.validate_fields(&shallow).is_ok());

        let mut deep = Value::Int(0);
        for _ in 0..4 {
            deep = Value::Array(vec![deep]);
        }
        assert!(matches!(
            limits.validate_value(&deep),
            Err(LimitError::NestingTooDeep { actual: 4, max: 3 })
        ));
    }

    #[test]
    fn test_field_name_length() {
        let limits = Limits::with_small_limits();
        let long_name = "x".repeat(65);
        let f = fields! { long_name => 1 };
        assert!(matches!(
            limits.validate_fields(&f),
            Err(LimitError::FieldNameTooLong { .. })
        ));
    }
}
