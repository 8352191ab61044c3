//! Optimistic multi-document transactions
//!
//! Reads go through the store's transactional read and join its conflict
//! detection. Writes are buffered here and handed to the store in a single
//! commit once the caller's closure returns `Ok`. The store rejects the
//! commit with `aborted` if a document read by the transaction changed in
//! the meantime; nothing is applied in that case.
//!
//! The store requires every read to precede every write, so a read issued
//! after a buffered write is rejected.
//!
//! Buffered writes are stamped when the transaction commits. A document the
//! transaction read is never stamped earlier than the `updatedAt` it saw.

use crate::batch::BatchOperation;
use crate::client::StoreClient;
use crate::context::OpContext;
use crate::document::Document;
use crate::record::Record;
use bazaar_core::{
    CollectionPath, DocumentPath, Error, Fields, Limits, Result, Timestamp, CREATED_AT, UPDATED_AT,
};
use bazaar_storage::{DocumentStore, NativeValue, TransactionId, Write};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Transaction-scoped accessor handed to the closure of `run_transaction`
pub struct TransactionContext {
    store: Arc<dyn DocumentStore>,
    txn: TransactionId,
    ctx: OpContext,
    limits: Limits,
    seen: HashMap<DocumentPath, Timestamp>,
    writes: Vec<BatchOperation>,
}

impl TransactionContext {
    /// Store transaction id
    pub fn id(&self) -> TransactionId {
        self.txn
    }

    /// Number of buffered writes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Read and decode a document; the read joins conflict detection
    pub async fn get<T: Record>(&mut self, path: &DocumentPath) -> Result<Option<Document<T>>> {
        if !self.writes.is_empty() {
            return Err(Error::invalid_argument(format!(
                "read of {} after {} buffered write(s); reads must precede writes in a transaction",
                path,
                self.writes.len()
            )));
        }
        let snapshot = self
            .ctx
            .call(self.store.transactional_get(self.txn, path))
            .await?;
        debug!(target: "bazaar::txn", txn = %self.txn, path = %path, found = snapshot.is_some(), "Transactional read");
        if let Some(NativeValue::Timestamp(stamp)) = snapshot.as_ref().and_then(|s| s.fields.get(UPDATED_AT)) {
            self.seen.insert(path.clone(), *stamp);
        }
        snapshot.as_ref().map(Document::<T>::from_snapshot).transpose()
    }

    /// Buffer a full overwrite of `path`
    pub fn set<T: Record>(&mut self, path: &DocumentPath, data: &T) -> Result<()> {
        let fields = data.to_fields();
        self.limits.validate_fields(&fields)?;
        self.writes.push(BatchOperation::set(path.clone(), fields));
        Ok(())
    }

    /// Buffer creation of a new document in `collection`; returns its path
    pub fn create<T: Record>(&mut self, collection: &CollectionPath, data: &T) -> Result<DocumentPath> {
        let path = collection.doc(self.store.new_document_id(collection))?;
        self.set(&path, data)?;
        Ok(path)
    }

    /// Buffer a partial update of an existing document
    ///
    /// The document must exist when the transaction commits.
    pub fn update(&mut self, path: &DocumentPath, mut partial: Fields) -> Result<()> {
        partial.remove(CREATED_AT);
        self.limits.validate_fields(&partial)?;
        self.writes.push(BatchOperation::update(path.clone(), partial));
        Ok(())
    }

    /// Buffer a delete
    pub fn delete(&mut self, path: &DocumentPath) {
        self.writes.push(BatchOperation::delete(path.clone()));
    }

    /// Stamp the buffered writes with `now`, raised per document to the
    /// `updatedAt` this transaction read
    fn into_writes(self, now: Timestamp) -> Result<Vec<Write>> {
        let TransactionContext { limits, seen, writes, .. } = self;
        writes
            .into_iter()
            .map(|op| {
                let stamp = seen.get(op.path()).map_or(now, |read| now.max(*read));
                op.into_write(stamp, &limits)
            })
            .collect()
    }
}

/// Begin, run `f`, then commit or roll back
pub(crate) async fn run<R, F>(client: &StoreClient, ctx: &OpContext, f: F) -> Result<R>
where
    R: Send,
    F: for<'t> FnOnce(&'t mut TransactionContext) -> BoxFuture<'t, Result<R>> + Send,
{
    let ctx = client.prepare(ctx);
    let store = client.store().clone();
    let txn = ctx.call(store.begin_transaction()).await?;
    debug!(target: "bazaar::txn", txn = %txn, "Transaction started");

    let mut tx = TransactionContext {
        store: store.clone(),
        txn,
        ctx: ctx.clone(),
        limits: client.limits().clone(),
        seen: HashMap::new(),
        writes: Vec::new(),
    };

    let value = match f(&mut tx).await {
        Ok(value) => value,
        Err(e) => {
            warn!(target: "bazaar::txn", txn = %txn, error = %e, "Transaction rolled back");
            rollback(&store, txn).await;
            return Err(e);
        }
    };

    let max = client.max_batch_operations();
    if tx.writes.len() > max {
        rollback(&store, txn).await;
        return Err(Error::BatchTooLarge {
            len: tx.writes.len(),
            max,
        });
    }

    let writes = match tx.into_writes(client.now()) {
        Ok(writes) => writes,
        Err(e) => {
            rollback(&store, txn).await;
            return Err(e);
        }
    };

    let count = writes.len();
    match ctx.call(store.commit_transaction(txn, writes)).await {
        Ok(_) => {
            info!(target: "bazaar::txn", txn = %txn, writes = count, "Transaction committed");
            Ok(value)
        }
        Err(e) => {
            warn!(target: "bazaar::txn", txn = %txn, error = %e, "Transaction aborted");
            if matches!(e, Error::Cancelled | Error::DeadlineExceeded) {
                rollback(&store, txn).await;
            }
            Err(e)
        }
    }
}

async fn rollback(store: &Arc<dyn DocumentStore>, txn: TransactionId) {
    if let Err(e) = store.rollback(txn).await {
        warn!(target: "bazaar::txn", txn = %txn, error = %e, "Rollback failed");
    }
}
