//! Typed records stored as documents
//!
//! A [`Record`] converts a domain struct to and from a field map. The
//! conversion is explicit per type; there is no runtime probing of values.
//!
//! ```
//! use bazaar_core::{fields, Fields, Result};
//! use bazaar_engine::{FieldReader, Record};
//!
//! struct Lead {
//!     name: String,
//!     score: i64,
//! }
//!
//! impl Record for Lead {
//!     fn to_fields(&self) -> Fields {
//!         fields! { "name" => self.name.as_str(), "score" => self.score }
//!     }
//!
//!     fn from_fields(fields: &Fields) -> Result<Self> {
//!         let r = FieldReader::new(fields);
//!         Ok(Lead { name: r.string("name")?, score: r.int("score")? })
//!     }
//! }
//! ```

use bazaar_core::{Error, Fields, Result, Value};
use chrono::{DateTime, Utc};

/// A type stored as the field map of a document
pub trait Record: Sized + Send + Sync + 'static {
    /// Field map written to the store (without `id` or timestamps)
    fn to_fields(&self) -> Fields;

    /// Rebuild the record from a stored field map
    fn from_fields(fields: &Fields) -> Result<Self>;
}

/// Untyped documents
impl Record for Fields {
    fn to_fields(&self) -> Fields {
        self.clone()
    }

    fn from_fields(fields: &Fields) -> Result<Self> {
        Ok(fields.clone())
    }
}

/// Typed accessors over a field map, producing `Error::Decode` on mismatch
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    fields: &'a Fields,
}

impl<'a> FieldReader<'a> {
    /// Wrap a field map
    pub fn new(fields: &'a Fields) -> Self {
        Self { fields }
    }

    fn mismatch(field: &str, expected: &'static str, found: Option<&Value>) -> Error {
        Error::Decode {
            field: field.to_string(),
            expected,
            found: found.map(Value::type_name).unwrap_or("missing"),
        }
    }

    /// Raw value; `None` if absent or null
    pub fn value(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Required string
    pub fn string(&self, field: &str) -> Result<String> {
        self.opt_string(field)?
            .ok_or_else(|| Self::mismatch(field, "String", None))
    }

    /// Optional string
    pub fn opt_string(&self, field: &str) -> Result<Option<String>> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            other => Err(Self::mismatch(field, "String", other)),
        }
    }

    /// Required integer
    pub fn int(&self, field: &str) -> Result<i64> {
        self.opt_int(field)?
            .ok_or_else(|| Self::mismatch(field, "Int", None))
    }

    /// Optional integer
    pub fn opt_int(&self, field: &str) -> Result<Option<i64>> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            other => Err(Self::mismatch(field, "Int", other)),
        }
    }

    /// Required float; integers are widened
    pub fn float(&self, field: &str) -> Result<f64> {
        self.opt_float(field)?
            .ok_or_else(|| Self::mismatch(field, "Float", None))
    }

    /// Optional float; integers are widened
    pub fn opt_float(&self, field: &str) -> Result<Option<f64>> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::Float(f)) => Ok(Some(*f)),
            Some(Value::Int(i)) => Ok(Some(*i as f64)),
            other => Err(Self::mismatch(field, "Float", other)),
        }
    }

    /// Required boolean
    pub fn bool(&self, field: &str) -> Result<bool> {
        match self.value(field) {
            Some(Value::Bool(b)) => Ok(*b),
            other => Err(Self::mismatch(field, "Bool", other)),
        }
    }

    /// Boolean defaulting to `false` when absent
    pub fn flag(&self, field: &str) -> Result<bool> {
        match self.value(field) {
            None => Ok(false),
            Some(_) => self.bool(field),
        }
    }

    /// Required date
    pub fn date(&self, field: &str) -> Result<DateTime<Utc>> {
        self.opt_date(field)?
            .ok_or_else(|| Self::mismatch(field, "Date", None))
    }

    /// Optional date; native timestamps are accepted
    pub fn opt_date(&self, field: &str) -> Result<Option<DateTime<Utc>>> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::Date(d)) => Ok(Some(*d)),
            Some(Value::Timestamp(t)) => Ok(Some(t.to_datetime())),
            other => Err(Self::mismatch(field, "Date", other)),
        }
    }

    /// List of strings; empty when absent
    pub fn strings(&self, field: &str) -> Result<Vec<String>> {
        match self.value(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(Self::mismatch(field, "String", Some(other))),
                })
                .collect(),
            other => Err(Self::mismatch(field, "Array", other)),
        }
    }

    /// Nested map; empty when absent
    pub fn map(&self, field: &str) -> Result<Fields> {
        match self.value(field) {
            None => Ok(Fields::new()),
            Some(Value::Map(m)) => Ok(m.clone()),
            other => Err(Self::mismatch(field, "Map", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::fields;
    use chrono::TimeZone;

    #[test]
    fn test_reads_typed_fields() {
        let when = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let f = fields! {
            "name" => "Walnut desk",
            "price" => 120,
            "ratio" => 0.5,
            "active" => true,
            "listedAt" => when,
            "tags" => vec!["oak".to_string(), "desk".to_string()],
        };
        let r = FieldReader::new(&f);

        assert_eq!(r.string("name").unwrap(), "Walnut desk");
        assert_eq!(r.int("price").unwrap(), 120);
        assert_eq!(r.float("price").unwrap(), 120.0);
        assert_eq!(r.float("ratio").unwrap(), 0.5);
        assert!(r.bool("active").unwrap());
        assert_eq!(r.date("listedAt").unwrap(), when);
        assert_eq!(r.strings("tags").unwrap(), vec!["oak", "desk"]);
    }

    #[test]
    fn test_missing_and_null_are_absent() {
        let f = fields! { "note" => Value::Null };
        let r = FieldReader::new(&f);

        assert_eq!(r.opt_string("note").unwrap(), None);
        assert!(!r.flag("archived").unwrap());
        assert!(r.strings("tags").unwrap().is_empty());

        let err = r.string("name").unwrap_err();
        assert!(matches!(
            err,
            Error::Decode { ref field, expected: "String", found: "missing" } if field == "name"
        ));
    }

    #[test]
    fn test_type_mismatch_reports_found_type() {
        let f = fields! { "price" => "cheap" };
        let err = FieldReader::new(&f).int("price").unwrap_err();
        assert!(matches!(err, Error::Decode { expected: "Int", found: "String", .. }));
    }

    #[test]
    fn test_fields_record_is_identity() {
        let f = fields! { "a" => 1 };
        assert_eq!(Fields::from_fields(&f.to_fields()).unwrap(), f);
    }
}
