//! Conversion between application values and store-native values
//!
//! Dates become native timestamps on the way in and come back as dates on
//! the way out. A value that is already a native timestamp passes through
//! `encode` untouched. Every other kind maps one to one, recursing through
//! arrays and maps.

use bazaar_core::{Fields, Timestamp, Value};
use bazaar_storage::{NativeMap, NativeValue};

/// Convert an application value to its store-native form
pub fn encode(value: &Value) -> NativeValue {
    match value {
        Value::Null => NativeValue::Null,
        Value::Bool(b) => NativeValue::Boolean(*b),
        Value::Int(i) => NativeValue::Integer(*i),
        Value::Float(f) => NativeValue::Double(*f),
        Value::String(s) => NativeValue::String(s.clone()),
        Value::Bytes(b) => NativeValue::Bytes(b.clone()),
        Value::Date(d) => NativeValue::Timestamp(Timestamp::from_datetime(d)),
        Value::Timestamp(t) => NativeValue::Timestamp(*t),
        Value::Array(items) => NativeValue::Array(items.iter().map(encode).collect()),
        Value::Map(map) => NativeValue::Map(encode_fields(map)),
    }
}

/// Convert a store-native value back to an application value
pub fn decode(value: &NativeValue) -> Value {
    match value {
        NativeValue::Null => Value::Null,
        NativeValue::Boolean(b) => Value::Bool(*b),
        NativeValue::Integer(i) => Value::Int(*i),
        NativeValue::Double(f) => Value::Float(*f),
        NativeValue::String(s) => Value::String(s.clone()),
        NativeValue::Bytes(b) => Value::Bytes(b.clone()),
        NativeValue::Timestamp(t) => Value::Date(t.to_datetime()),
        NativeValue::Array(items) => Value::Array(items.iter().map(decode).collect()),
        NativeValue::Map(map) => Value::Map(decode_fields(map)),
    }
}

/// Encode every field of a map
pub fn encode_fields(fields: &Fields) -> NativeMap {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode(v)))
        .collect()
}

/// Decode every field of a map
pub fn decode_fields(fields: &NativeMap) -> Fields {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode(v)))
        .collect()
}
