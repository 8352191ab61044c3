//! MemoryStore: in-process DocumentStore backend
//!
//! This module implements the DocumentStore trait using:
//! - `BTreeMap<DocumentPath, StoredDocument>` for ordered document storage
//! - `parking_lot::RwLock` for thread-safe access
//! - a global commit version stamped on every written document
//! - read-set validation for optimistic transactions
//!
//! # Design Notes
//!
//! - **Atomic commits**: writes are staged against a copy of the touched
//!   documents and only applied once every write has succeeded.
//! - **Monotonic commit times**: each commit gets a nanosecond timestamp
//!   strictly greater than the previous commit's.
//! - **Fault injection**: `fail_next_commit` / `fail_next_read` queue store
//!   errors returned by the next matching round trip.

mod index;
mod validation;

pub use index::{IndexDefinition, IndexPolicy};
pub use validation::{ConflictType, ValidationResult};

use crate::native::{deep_merge, set_field, NativeMap};
use crate::query::StoreQuery;
use crate::snapshot::DocumentSnapshot;
use crate::traits::{DocumentStore, StoreResult, TransactionId};
use crate::write::Write;
use async_trait::async_trait;
use bazaar_core::{CollectionPath, DocumentPath, Limits, StoreError, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use validation::{validate_read_set, ABSENT_VERSION};

#[derive(Debug, Clone)]
struct StoredDocument {
    fields: NativeMap,
    create_time: Timestamp,
    update_time: Timestamp,
    version: u64,
}

impl StoredDocument {
    fn snapshot(&self, path: &DocumentPath) -> DocumentSnapshot {
        DocumentSnapshot {
            path: path.clone(),
            fields: self.fields.clone(),
            create_time: self.create_time,
            update_time: self.update_time,
            version: self.version,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<DocumentPath, StoredDocument>,
    version: u64,
    last_commit: Timestamp,
}

impl State {
    fn next_commit_time(&self) -> Timestamp {
        let now = Timestamp::now();
        if now > self.last_commit {
            now
        } else {
            self.last_commit.next_nano()
        }
    }

    /// Stage `writes` without touching live state
    fn stage(
        &self,
        writes: Vec<Write>,
        commit_time: Timestamp,
        version: u64,
    ) -> StoreResult<BTreeMap<DocumentPath, Option<StoredDocument>>> {
        let mut staged: BTreeMap<DocumentPath, Option<StoredDocument>> = BTreeMap::new();

        for write in writes {
            let current = match staged.get(write.path()) {
                Some(doc) => doc.clone(),
                None => self.documents.get(write.path()).cloned(),
            };
            let create_time = current
                .as_ref()
                .map(|d| d.create_time)
                .unwrap_or(commit_time);

            match write {
                Write::Set {
                    path,
                    fields,
                    merge,
                } => {
                    let fields = match (merge, current) {
                        (true, Some(existing)) => {
                            let mut merged = existing.fields;
                            deep_merge(&mut merged, fields);
                            merged
                        }
                        _ => fields,
                    };
                    staged.insert(
                        path,
                        Some(StoredDocument {
                            fields,
                            create_time,
                            update_time: commit_time,
                            version,
                        }),
                    );
                }
                Write::Update { path, fields } => {
                    let mut existing = current.ok_or_else(|| {
                        StoreError::not_found(format!("No document to update: {}", path))
                    })?;
                    for (field, value) in fields {
                        set_field(&mut existing.fields, &field, value);
                    }
                    existing.update_time = commit_time;
                    existing.version = version;
                    staged.insert(path, Some(existing));
                }
                Write::Delete { path } => {
                    staged.insert(path, None);
                }
            }
        }

        Ok(staged)
    }

    fn apply(&mut self, staged: BTreeMap<DocumentPath, Option<StoredDocument>>) {
        for (path, doc) in staged {
            match doc {
                Some(doc) => {
                    self.documents.insert(path, doc);
                }
                None => {
                    self.documents.remove(&path);
                }
            }
        }
    }

    /// Stage and apply `writes` as one commit
    fn commit(&mut self, writes: Vec<Write>) -> StoreResult<Timestamp> {
        let commit_time = self.next_commit_time();
        let version = self.version + 1;
        let staged = self.stage(writes, commit_time, version)?;
        self.apply(staged);
        self.version = version;
        self.last_commit = commit_time;
        Ok(commit_time)
    }

    fn current_version(&self, path: &DocumentPath) -> Option<u64> {
        self.documents.get(path).map(|d| d.version)
    }
}

/// Counters of store round trips
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Single-document reads, transactional reads included
    pub gets: u64,
    /// Queries run
    pub queries: u64,
    /// Count aggregations run
    pub counts: u64,
    /// Commits attempted, transactional commits included
    pub commits: u64,
    /// Writes applied by successful commits
    pub writes: u64,
    /// Transactions opened
    pub transactions: u64,
    /// Transactions aborted by a conflict
    pub aborts: u64,
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    queries: AtomicU64,
    counts: AtomicU64,
    commits: AtomicU64,
    writes: AtomicU64,
    transactions: AtomicU64,
    aborts: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StoreStats {
        StoreStats {
            gets: self.gets.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            counts: self.counts.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            transactions: self.transactions.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
        }
    }
}

/// In-memory document store
///
/// Thread-safe through `parking_lot` locks. Clone the surrounding `Arc` to
/// share one store between clients.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
    /// Open transactions and the versions they read
    transactions: Mutex<HashMap<TransactionId, HashMap<DocumentPath, u64>>>,
    next_txn: AtomicU64,
    max_batch_writes: usize,
    index_policy: IndexPolicy,
    indexes: RwLock<Vec<IndexDefinition>>,
    commit_failures: Mutex<VecDeque<StoreError>>,
    read_failures: Mutex<VecDeque<StoreError>>,
    counters: Counters,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with default limits
    pub fn new() -> Self {
        Self::with_limits(&Limits::default())
    }

    /// Create an empty store enforcing `limits`
    pub fn with_limits(limits: &Limits) -> Self {
        Self {
            state: RwLock::new(State::default()),
            transactions: Mutex::new(HashMap::new()),
            next_txn: AtomicU64::new(1),
            max_batch_writes: limits.max_batch_operations,
            index_policy: IndexPolicy::default(),
            indexes: RwLock::new(Vec::new()),
            commit_failures: Mutex::new(VecDeque::new()),
            read_failures: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
        }
    }

    /// Set the composite index policy
    pub fn with_index_policy(mut self, policy: IndexPolicy) -> Self {
        self.index_policy = policy;
        self
    }

    /// Declare a composite index
    pub fn declare_index(&self, index: IndexDefinition) {
        self.indexes.write().push(index);
    }

    /// Make the next commit (plain or transactional) fail with `error`
    ///
    /// Calls queue up; each commit consumes one. Nothing is written by a
    /// failed commit.
    pub fn fail_next_commit(&self, error: StoreError) {
        self.commit_failures.lock().push_back(error);
    }

    /// Make the next read round trip (get, query, or count) fail with `error`
    pub fn fail_next_read(&self, error: StoreError) {
        self.read_failures.lock().push_back(error);
    }

    /// Round-trip counters since creation
    pub fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }

    /// Number of stored documents, across all collections
    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    /// True if no documents are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of open transactions
    pub fn open_transactions(&self) -> usize {
        self.transactions.lock().len()
    }

    fn take_read_failure(&self) -> StoreResult<()> {
        match self.read_failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn take_commit_failure(&self) -> StoreResult<()> {
        match self.commit_failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_batch_size(&self, len: usize) -> StoreResult<()> {
        if len > self.max_batch_writes {
            return Err(StoreError::invalid_argument(format!(
                "maximum {} writes allowed per request, got {}",
                self.max_batch_writes, len
            )));
        }
        Ok(())
    }

    fn evaluate(&self, query: &StoreQuery) -> StoreResult<Vec<DocumentSnapshot>> {
        index::check_query(self.index_policy, &self.indexes.read(), query)?;
        let state = self.state.read();
        let candidates = state
            .documents
            .iter()
            .filter(|(path, _)| query.scope.contains(path))
            .map(|(path, doc)| doc.snapshot(path));
        Ok(query.evaluate(candidates))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn new_document_id(&self, _collection: &CollectionPath) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn max_batch_writes(&self) -> usize {
        self.max_batch_writes
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<DocumentSnapshot>> {
        Counters::bump(&self.counters.gets, 1);
        self.take_read_failure()?;
        let state = self.state.read();
        let found = state.documents.get(path).map(|doc| doc.snapshot(path));
        debug!(target: "bazaar::store", path = %path, found = found.is_some(), "Document read");
        Ok(found)
    }

    async fn run_query(&self, query: &StoreQuery) -> StoreResult<Vec<DocumentSnapshot>> {
        Counters::bump(&self.counters.queries, 1);
        self.take_read_failure()?;
        let results = self.evaluate(query)?;
        debug!(
            target: "bazaar::store",
            collection = query.scope.collection_id(),
            results = results.len(),
            "Query completed"
        );
        Ok(results)
    }

    async fn run_count(&self, query: &StoreQuery) -> StoreResult<u64> {
        Counters::bump(&self.counters.counts, 1);
        self.take_read_failure()?;
        Ok(self.evaluate(query)?.len() as u64)
    }

    async fn commit(&self, writes: Vec<Write>) -> StoreResult<Timestamp> {
        Counters::bump(&self.counters.commits, 1);
        self.check_batch_size(writes.len())?;
        self.take_commit_failure()?;

        let count = writes.len() as u64;
        let commit_time = self.state.write().commit(writes)?;
        Counters::bump(&self.counters.writes, count);
        debug!(target: "bazaar::store", writes = count, commit_time = %commit_time, "Commit applied");
        Ok(commit_time)
    }

    async fn begin_transaction(&self) -> StoreResult<TransactionId> {
        Counters::bump(&self.counters.transactions, 1);
        let txn = TransactionId(self.next_txn.fetch_add(1, Ordering::SeqCst));
        self.transactions.lock().insert(txn, HashMap::new());
        debug!(target: "bazaar::store", txn = %txn, "Transaction started");
        Ok(txn)
    }

    async fn transactional_get(
        &self,
        txn: TransactionId,
        path: &DocumentPath,
    ) -> StoreResult<Option<DocumentSnapshot>> {
        Counters::bump(&self.counters.gets, 1);
        self.take_read_failure()?;

        let mut transactions = self.transactions.lock();
        let read_set = transactions.get_mut(&txn).ok_or_else(|| {
            StoreError::invalid_argument(format!("Transaction {} is not open", txn))
        })?;

        let state = self.state.read();
        let found = state.documents.get(path).map(|doc| doc.snapshot(path));
        let version = found.as_ref().map(|d| d.version).unwrap_or(ABSENT_VERSION);
        read_set.entry(path.clone()).or_insert(version);
        Ok(found)
    }

    async fn commit_transaction(
        &self,
        txn: TransactionId,
        writes: Vec<Write>,
    ) -> StoreResult<Timestamp> {
        Counters::bump(&self.counters.commits, 1);
        let read_set = self.transactions.lock().remove(&txn).ok_or_else(|| {
            StoreError::invalid_argument(format!("Transaction {} is not open", txn))
        })?;
        self.check_batch_size(writes.len())?;
        self.take_commit_failure()?;

        let count = writes.len() as u64;
        let mut state = self.state.write();
        let validation = validate_read_set(&read_set, |p| state.current_version(p));
        if !validation.is_valid() {
            Counters::bump(&self.counters.aborts, 1);
            let first = validation.conflicts[0].path().to_string();
            warn!(
                target: "bazaar::store",
                txn = %txn,
                conflicts = validation.conflict_count(),
                "Transaction aborted by concurrent write"
            );
            return Err(StoreError::aborted(format!(
                "Transaction {} conflicts with a concurrent write to {}",
                txn, first
            )));
        }

        let commit_time = state.commit(writes)?;
        Counters::bump(&self.counters.writes, count);
        debug!(target: "bazaar::store", txn = %txn, writes = count, "Transaction committed");
        Ok(commit_time)
    }

    async fn rollback(&self, txn: TransactionId) -> StoreResult<()> {
        self.transactions.lock().remove(&txn);
        debug!(target: "bazaar::store", txn = %txn, "Transaction rolled back");
        Ok(())
    }
}
