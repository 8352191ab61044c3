//! DocumentStore trait definition.

use crate::query::StoreQuery;
use crate::snapshot::DocumentSnapshot;
use crate::write::Write;
use async_trait::async_trait;
use bazaar_core::{CollectionPath, DocumentPath, StoreError, Timestamp};
use std::fmt;

/// Result of a store round trip
pub type StoreResult<T> = Result<T, StoreError>;

/// Handle of an open store transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Abstract remote document store.
///
/// Every method is one round trip. Implementations must be thread-safe and
/// report failures as [`StoreError`] with a store code; the access layer
/// propagates them unmodified.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    // Identity

    /// Allocate a fresh, unique document id for `collection`.
    fn new_document_id(&self, collection: &CollectionPath) -> String;

    /// Maximum number of writes accepted by one commit.
    fn max_batch_writes(&self) -> usize;

    // Reads

    /// Read one document; `None` if it does not exist.
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<DocumentSnapshot>>;

    /// Run a query and return matching documents in query order.
    async fn run_query(&self, query: &StoreQuery) -> StoreResult<Vec<DocumentSnapshot>>;

    /// Count matching documents without transferring them.
    ///
    /// Ordering, bounds, and limit of `query` apply as for `run_query`.
    async fn run_count(&self, query: &StoreQuery) -> StoreResult<u64>;

    // Writes

    /// Apply `writes` atomically. Returns the commit time.
    async fn commit(&self, writes: Vec<Write>) -> StoreResult<Timestamp>;

    // Transactions

    /// Open an optimistic transaction.
    async fn begin_transaction(&self) -> StoreResult<TransactionId>;

    /// Read a document inside a transaction; the read joins its read set.
    async fn transactional_get(
        &self,
        txn: TransactionId,
        path: &DocumentPath,
    ) -> StoreResult<Option<DocumentSnapshot>>;

    /// Validate the read set and apply `writes` atomically.
    ///
    /// Fails with `aborted` if any document read by the transaction changed
    /// since it was read. The transaction is closed either way.
    async fn commit_transaction(
        &self,
        txn: TransactionId,
        writes: Vec<Write>,
    ) -> StoreResult<Timestamp>;

    /// Abandon a transaction without writing.
    async fn rollback(&self, txn: TransactionId) -> StoreResult<()>;
}
