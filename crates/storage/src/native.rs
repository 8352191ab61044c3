//! Store-native value representation
//!
//! The store orders values across types, which is what makes range filters
//! and cursors well defined on heterogeneous fields. Type order:
//!
//! ```text
//! Null < Boolean < number (Integer and Double interleaved) < Timestamp
//!      < String < Bytes < Array < Map
//! ```
//!
//! Integer and Double compare by numeric value, so `Integer(1)` equals
//! `Double(1.0)` for query purposes. NaN sorts below every other number and
//! equals itself.

use bazaar_core::Timestamp;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Field map of a stored document
pub type NativeMap = BTreeMap<String, NativeValue>;

/// Value as held by the document store
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit integer
    Integer(i64),
    /// 64-bit float
    Double(f64),
    /// Nanosecond timestamp
    Timestamp(Timestamp),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Array of values
    Array(Vec<NativeValue>),
    /// Nested map
    Map(NativeMap),
}

impl NativeValue {
    fn type_rank(&self) -> u8 {
        match self {
            NativeValue::Null => 0,
            NativeValue::Boolean(_) => 1,
            NativeValue::Integer(_) | NativeValue::Double(_) => 2,
            NativeValue::Timestamp(_) => 3,
            NativeValue::String(_) => 4,
            NativeValue::Bytes(_) => 5,
            NativeValue::Array(_) => 6,
            NativeValue::Map(_) => 7,
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Boolean(_) => "boolean",
            NativeValue::Integer(_) => "integer",
            NativeValue::Double(_) => "double",
            NativeValue::Timestamp(_) => "timestamp",
            NativeValue::String(_) => "string",
            NativeValue::Bytes(_) => "bytes",
            NativeValue::Array(_) => "array",
            NativeValue::Map(_) => "map",
        }
    }

    /// True when both values are of the same comparable type family
    pub fn same_type_family(&self, other: &NativeValue) -> bool {
        self.type_rank() == other.type_rank()
    }

    /// Total order used by filters, sorting, and cursors
    pub fn store_cmp(&self, other: &NativeValue) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (NativeValue::Boolean(a), NativeValue::Boolean(b)) => a.cmp(b),
            (NativeValue::Integer(a), NativeValue::Integer(b)) => a.cmp(b),
            (NativeValue::Integer(a), NativeValue::Double(b)) => cmp_f64(*a as f64, *b),
            (NativeValue::Double(a), NativeValue::Integer(b)) => cmp_f64(*a, *b as f64),
            (NativeValue::Double(a), NativeValue::Double(b)) => cmp_f64(*a, *b),
            (NativeValue::Timestamp(a), NativeValue::Timestamp(b)) => a.cmp(b),
            (NativeValue::String(a), NativeValue::String(b)) => a.cmp(b),
            (NativeValue::Bytes(a), NativeValue::Bytes(b)) => a.cmp(b),
            (NativeValue::Array(a), NativeValue::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.store_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (NativeValue::Map(a), NativeValue::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = ka.cmp(kb).then_with(|| va.store_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => Ordering::Equal,
        }
    }

    /// Query equality (numeric across Integer/Double, NaN equals NaN)
    pub fn store_eq(&self, other: &NativeValue) -> bool {
        self.store_cmp(other) == Ordering::Equal
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Look up a possibly dotted field path (`"address.city"`)
pub fn get_field<'a>(fields: &'a NativeMap, path: &str) -> Option<&'a NativeValue> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = fields.get(first)?;
    for part in parts {
        match current {
            NativeValue::Map(map) => current = map.get(part)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Set a possibly dotted field path, creating intermediate maps
pub fn set_field(fields: &mut NativeMap, path: &str, value: NativeValue) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = fields
                .entry(head.to_string())
                .or_insert_with(|| NativeValue::Map(NativeMap::new()));
            if !matches!(entry, NativeValue::Map(_)) {
                *entry = NativeValue::Map(NativeMap::new());
            }
            if let NativeValue::Map(inner) = entry {
                set_field(inner, rest, value);
            }
        }
    }
}

/// Merge `patch` into `target`: nested maps merge recursively, every other
/// value replaces what was there.
pub fn deep_merge(target: &mut NativeMap, patch: NativeMap) {
    for (key, value) in patch {
        if let NativeValue::Map(incoming) = value {
            if let Some(NativeValue::Map(existing)) = target.get_mut(&key) {
                deep_merge(existing, incoming);
                continue;
            }
            target.insert(key, NativeValue::Map(incoming));
        } else {
            target.insert(key, value);
        }
    }
}
