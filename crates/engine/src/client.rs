//! Shared handle to the document store
//!
//! Built once at the composition root and cloned into every service. There
//! is no process-wide client; tests build one per store.

use crate::collection::CollectionService;
use crate::config::AccessConfig;
use crate::context::OpContext;
use crate::record::Record;
use crate::subcollection::SubcollectionService;
use crate::transaction::{self, TransactionContext};
use bazaar_core::{CollectionPath, Limits, Result, Timestamp};
use bazaar_storage::{DocumentStore, MemoryStore};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Store handle plus access configuration
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn DocumentStore>,
    config: Arc<AccessConfig>,
    limits: Limits,
}

impl fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreClient")
            .field("config", &self.config)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    /// Client with default configuration
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            config: Arc::new(AccessConfig::default()),
            limits: Limits::default(),
        }
    }

    /// Client with an explicit configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration does not validate.
    pub fn with_config(store: Arc<dyn DocumentStore>, config: AccessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: Arc::new(config),
            limits: Limits::default(),
        })
    }

    /// Client over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Replace the request limits checked before store calls
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Access configuration
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Request limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Effective per-batch maximum: the smallest of config, limits, and store
    pub fn max_batch_operations(&self) -> usize {
        self.config
            .max_batch_operations
            .min(self.limits.max_batch_operations)
            .min(self.store.max_batch_writes())
    }

    /// Fresh context carrying the configured default timeout
    pub fn context(&self) -> OpContext {
        self.prepare(&OpContext::background())
    }

    /// Apply the default timeout to a caller context lacking a deadline
    pub(crate) fn prepare(&self, ctx: &OpContext) -> OpContext {
        ctx.clone().or_timeout(self.config.default_timeout())
    }

    /// Millisecond-truncated current time used for `createdAt` / `updatedAt`
    pub(crate) fn now(&self) -> Timestamp {
        Timestamp::now().truncate_to_millis()
    }

    /// Service over a top-level collection
    pub fn collection<T: Record>(&self, name: &str) -> Result<CollectionService<T>> {
        Ok(CollectionService::new(
            self.clone(),
            CollectionPath::root(name)?,
        ))
    }

    /// Service over the `name` subcollection of every `parent_collection` document
    pub fn subcollection<T: Record>(
        &self,
        parent_collection: &str,
        name: &str,
    ) -> Result<SubcollectionService<T>> {
        SubcollectionService::new(self.clone(), CollectionPath::root(parent_collection)?, name)
    }

    /// Run `f` inside an optimistic transaction
    ///
    /// See [`CollectionService::run_transaction`].
    pub async fn run_transaction<R, F>(&self, ctx: &OpContext, f: F) -> Result<R>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut TransactionContext) -> BoxFuture<'t, Result<R>> + Send,
    {
        transaction::run(self, ctx, f).await
    }
}
