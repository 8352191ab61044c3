//! Decoded documents

use crate::codec::decode_fields;
use crate::record::Record;
use bazaar_core::{Fields, Result, Value, CREATED_AT, UPDATED_AT};
use bazaar_storage::DocumentSnapshot;
use chrono::{DateTime, Utc};
use std::ops::Deref;

/// A stored record together with its identity and lifecycle timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    /// Document id, assigned once
    pub id: String,
    /// Set once when the document is created
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation; never decreases
    pub updated_at: DateTime<Utc>,
    /// Record fields
    pub data: T,
}

impl<T> Document<T> {
    /// Consume the document, keeping the record
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T: Record> Document<T> {
    /// Decode a snapshot
    ///
    /// Missing `createdAt` / `updatedAt` fields fall back to the store's own
    /// create and update times.
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Result<Self> {
        let mut fields = decode_fields(&snapshot.fields);
        let created_at = take_date(&mut fields, CREATED_AT)
            .unwrap_or_else(|| snapshot.create_time.to_datetime());
        let updated_at = take_date(&mut fields, UPDATED_AT)
            .unwrap_or_else(|| snapshot.update_time.to_datetime());

        Ok(Document {
            id: snapshot.id().to_string(),
            created_at,
            updated_at,
            data: T::from_fields(&fields)?,
        })
    }
}

impl<T> Deref for Document<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

fn take_date(fields: &mut Fields, name: &str) -> Option<DateTime<Utc>> {
    match fields.remove(name)? {
        Value::Date(d) => Some(d),
        Value::Timestamp(t) => Some(t.to_datetime()),
        _ => None,
    }
}
