//! Atomic multi-document writes

use crate::client::StoreClient;
use crate::codec::encode_fields;
use crate::context::OpContext;
use bazaar_core::{
    DocumentPath, Error, Fields, Limits, Result, Timestamp, CREATED_AT, UPDATED_AT,
};
use bazaar_storage::{NativeMap, NativeValue, Write};
use tracing::info;

/// One operation of an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    /// Create or overwrite; stamps `createdAt` and `updatedAt`
    Set {
        /// Target document
        path: DocumentPath,
        /// Full field map
        fields: Fields,
    },
    /// Patch an existing document; stamps `updatedAt`
    Update {
        /// Target document
        path: DocumentPath,
        /// Fields to change
        fields: Fields,
    },
    /// Remove a document
    Delete {
        /// Target document
        path: DocumentPath,
    },
}

impl BatchOperation {
    /// Create or overwrite `path`
    pub fn set(path: DocumentPath, fields: Fields) -> Self {
        BatchOperation::Set { path, fields }
    }

    /// Patch `path`
    pub fn update(path: DocumentPath, fields: Fields) -> Self {
        BatchOperation::Update { path, fields }
    }

    /// Delete `path`
    pub fn delete(path: DocumentPath) -> Self {
        BatchOperation::Delete { path }
    }

    /// Target document
    pub fn path(&self) -> &DocumentPath {
        match self {
            BatchOperation::Set { path, .. }
            | BatchOperation::Update { path, .. }
            | BatchOperation::Delete { path } => path,
        }
    }

    /// Convert to a store write stamped with `now`
    pub(crate) fn into_write(self, now: Timestamp, limits: &Limits) -> Result<Write> {
        Ok(match self {
            BatchOperation::Set { path, fields } => Write::set(path, created_fields(&fields, now, limits)?),
            BatchOperation::Update { path, fields } => {
                Write::update(path, updated_fields(fields, now, limits)?)
            }
            BatchOperation::Delete { path } => Write::delete(path),
        })
    }
}

/// Encode a full record and stamp both timestamps
pub(crate) fn created_fields(fields: &Fields, now: Timestamp, limits: &Limits) -> Result<NativeMap> {
    limits.validate_fields(fields)?;
    let mut native = encode_fields(fields);
    native.insert(CREATED_AT.to_string(), NativeValue::Timestamp(now));
    native.insert(UPDATED_AT.to_string(), NativeValue::Timestamp(now));
    Ok(native)
}

/// Encode a partial update and stamp `updatedAt`; `createdAt` is never rewritten
pub(crate) fn updated_fields(mut fields: Fields, now: Timestamp, limits: &Limits) -> Result<NativeMap> {
    fields.remove(CREATED_AT);
    limits.validate_fields(&fields)?;
    let mut native = encode_fields(&fields);
    native.insert(UPDATED_AT.to_string(), NativeValue::Timestamp(now));
    Ok(native)
}

/// Commit `ops` as one atomic unit
///
/// Empty input returns without a store call. More operations than the
/// client's batch maximum fail with `BatchTooLarge`, also without a store
/// call.
pub(crate) async fn commit(client: &StoreClient, ctx: &OpContext, ops: Vec<BatchOperation>) -> Result<()> {
    if ops.is_empty() {
        return Ok(());
    }
    let max = client.max_batch_operations();
    if ops.len() > max {
        return Err(Error::BatchTooLarge { len: ops.len(), max });
    }

    let now = client.now();
    let writes = ops
        .into_iter()
        .map(|op| op.into_write(now, client.limits()))
        .collect::<Result<Vec<_>>>()?;
    let count = writes.len();

    let ctx = client.prepare(ctx);
    ctx.call(client.store().commit(writes)).await?;
    info!(target: "bazaar::batch", operations = count, "Batch committed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::fields;

    fn path() -> DocumentPath {
        DocumentPath::parse("listings/a").unwrap()
    }

    #[test]
    fn test_set_stamps_both_timestamps() {
        let now = Timestamp::from_millis(42);
        let write = BatchOperation::set(path(), fields! { "name" => "Foo" })
            .into_write(now, &Limits::default())
            .unwrap();
        let Write::Set { fields, merge, .. } = write else {
            panic!("expected set");
        };
        assert!(!merge);
        assert_eq!(fields.get(CREATED_AT), Some(&NativeValue::Timestamp(now)));
        assert_eq!(fields.get(UPDATED_AT), Some(&NativeValue::Timestamp(now)));
    }

    #[test]
    fn test_update_never_rewrites_created_at() {
        let now = Timestamp::from_millis(42);
        let write = BatchOperation::update(
            path(),
            fields! { "name" => "Bar", CREATED_AT => Timestamp::EPOCH },
        )
        .into_write(now, &Limits::default())
        .unwrap();
        let Write::Update { fields, .. } = write else {
            panic!("expected update");
        };
        assert!(!fields.contains_key(CREATED_AT));
        assert_eq!(fields.get(UPDATED_AT), Some(&NativeValue::Timestamp(now)));
    }

    #[test]
    fn test_field_limits_checked() {
        let limits = Limits::with_small_limits();
        let long_name = "x".repeat(100);
        let err = BatchOperation::set(path(), fields! { long_name.as_str() => 1 })
            .into_write(Timestamp::EPOCH, &limits)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
