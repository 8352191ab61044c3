//! Typed CRUD, query and batch access to one collection

use crate::batch::{self, created_fields, updated_fields, BatchOperation};
use crate::client::StoreClient;
use crate::config::CreatePolicy;
use crate::context::OpContext;
use crate::document::Document;
use crate::query::{Cursor, PaginatedResult, QueryOptions, WhereClause};
use crate::record::Record;
use crate::transaction::{self, TransactionContext};
use bazaar_core::{
    CollectionPath, DocumentPath, Error, Fields, Result, Timestamp, UPDATED_AT,
};
use bazaar_storage::{DocumentSnapshot, NativeValue, StoreQuery, Write};
use futures::future::BoxFuture;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Page size used by `query_paginated` when the options carry no limit
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Access to the documents of one collection, decoded as `T`
pub struct CollectionService<T> {
    client: StoreClient,
    path: CollectionPath,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for CollectionService<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            path: self.path.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for CollectionService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionService")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<T: Record> CollectionService<T> {
    /// Service over the collection at `path`
    pub fn new(client: StoreClient, path: CollectionPath) -> Self {
        Self {
            client,
            path,
            _record: PhantomData,
        }
    }

    /// Collection path
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Client the service runs on
    pub fn client(&self) -> &StoreClient {
        &self.client
    }

    /// Path of document `id`, for use inside transactions and batches
    pub fn doc_path(&self, id: &str) -> Result<DocumentPath> {
        self.client.limits().validate_document_id(id)?;
        self.path.doc(id)
    }

    fn base_query(&self) -> StoreQuery {
        StoreQuery::collection(self.path.clone())
    }

    async fn read(&self, ctx: &OpContext, path: &DocumentPath) -> Result<Option<DocumentSnapshot>> {
        let snapshot = ctx.call(self.client.store().get(path)).await?;
        debug!(
            target: "bazaar::collection",
            collection = %self.path,
            id = path.id(),
            found = snapshot.is_some(),
            "Document read"
        );
        Ok(snapshot)
    }

    async fn write(&self, ctx: &OpContext, write: Write) -> Result<Timestamp> {
        let kind = write.kind();
        let id = write.path().id().to_string();
        let commit_time = ctx.call(self.client.store().commit(vec![write])).await?;
        debug!(target: "bazaar::collection", collection = %self.path, id = %id, kind, "Document written");
        Ok(commit_time)
    }

    async fn reread(&self, ctx: &OpContext, path: &DocumentPath) -> Result<Document<T>> {
        match self.read(ctx, path).await? {
            Some(snapshot) => Document::from_snapshot(&snapshot),
            None => Err(Error::not_found(path)),
        }
    }

    async fn put(&self, ctx: &OpContext, path: DocumentPath, data: &T) -> Result<Document<T>> {
        let ctx = self.client.prepare(ctx);
        let now = self.client.now();
        let fields = data.to_fields();
        let native = created_fields(&fields, now, self.client.limits())?;
        self.write(&ctx, Write::set(path.clone(), native)).await?;

        match self.client.config().create_policy {
            CreatePolicy::Reread => self.reread(&ctx, &path).await,
            CreatePolicy::Echo => Ok(Document {
                id: path.id().to_string(),
                created_at: now.to_datetime(),
                updated_at: now.to_datetime(),
                data: T::from_fields(&fields)?,
            }),
        }
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Create a document with a store-generated id
    ///
    /// `createdAt` and `updatedAt` share one timestamp. The returned document
    /// is the stored value re-read from the store, or the input echoed back,
    /// per the configured [`CreatePolicy`].
    pub async fn create(&self, ctx: &OpContext, data: &T) -> Result<Document<T>> {
        let id = self.client.store().new_document_id(&self.path);
        self.put(ctx, self.path.doc(id)?, data).await
    }

    /// Create or overwrite document `id`
    ///
    /// No existence check is made; the last writer wins.
    pub async fn create_with_id(&self, ctx: &OpContext, id: &str, data: &T) -> Result<Document<T>> {
        self.put(ctx, self.doc_path(id)?, data).await
    }

    /// Read document `id`; `None` if it does not exist
    pub async fn get_by_id(&self, ctx: &OpContext, id: &str) -> Result<Option<Document<T>>> {
        let ctx = self.client.prepare(ctx);
        let path = self.doc_path(id)?;
        self.read(&ctx, &path)
            .await?
            .as_ref()
            .map(Document::<T>::from_snapshot)
            .transpose()
    }

    /// Change the given fields of an existing document and return the result
    ///
    /// Fails with `Error::NotFound` before any write if the document does
    /// not exist. The partial is merged: nested maps keep the keys it does
    /// not name. `updatedAt` is refreshed and never moves backwards.
    pub async fn update(&self, ctx: &OpContext, id: &str, partial: Fields) -> Result<Document<T>> {
        let ctx = self.client.prepare(ctx);
        let path = self.doc_path(id)?;
        let current = self
            .read(&ctx, &path)
            .await?
            .ok_or_else(|| Error::not_found(&path))?;

        let now = match current.get(UPDATED_AT) {
            Some(NativeValue::Timestamp(stored)) => self.client.now().max(*stored),
            _ => self.client.now(),
        };
        let native = updated_fields(partial, now, self.client.limits())?;
        self.write(&ctx, Write::merge(path.clone(), native)).await?;
        self.reread(&ctx, &path).await
    }

    /// Delete document `id`; deleting a missing document succeeds
    pub async fn delete(&self, ctx: &OpContext, id: &str) -> Result<()> {
        let ctx = self.client.prepare(ctx);
        let path = self.doc_path(id)?;
        self.write(&ctx, Write::delete(path)).await?;
        Ok(())
    }

    /// True if document `id` exists
    pub async fn exists(&self, ctx: &OpContext, id: &str) -> Result<bool> {
        let ctx = self.client.prepare(ctx);
        let path = self.doc_path(id)?;
        Ok(self.read(&ctx, &path).await?.is_some())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn fetch(&self, ctx: &OpContext, query: &StoreQuery) -> Result<Vec<DocumentSnapshot>> {
        let results = ctx.call(self.client.store().run_query(query)).await?;
        debug!(
            target: "bazaar::collection",
            collection = %self.path,
            results = results.len(),
            "Query completed"
        );
        Ok(results)
    }

    /// Run a query
    ///
    /// Composite index requirements are the store's to enforce; an
    /// unindexed query surfaces as the store's `failed-precondition`.
    pub async fn query(&self, ctx: &OpContext, options: &QueryOptions) -> Result<Vec<Document<T>>> {
        let ctx = self.client.prepare(ctx);
        let query = options.apply(self.base_query(), self.client.limits())?;
        self.fetch(&ctx, &query)
            .await?
            .iter()
            .map(Document::from_snapshot)
            .collect()
    }

    /// Run a query one page at a time
    ///
    /// The page size is `options.limit` (default [`DEFAULT_PAGE_SIZE`]). One
    /// extra document is requested to decide `has_more`. Pass the returned
    /// cursor to `start_after` for the next page. `total` is filled when
    /// `options.with_total` is set and counts every document matching the
    /// filters.
    pub async fn query_paginated(&self, ctx: &OpContext, options: &QueryOptions) -> Result<PaginatedResult<T>> {
        let ctx = self.client.prepare(ctx);
        let page_size = options.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(Error::invalid_argument("page size must be at least 1"));
        }

        let query = options
            .apply_unlimited(self.base_query(), self.client.limits())?
            .limit(page_size + 1);
        let mut snapshots = self.fetch(&ctx, &query).await?;
        let has_more = snapshots.len() > page_size;
        snapshots.truncate(page_size);

        let cursor = match snapshots.last() {
            Some(last) => {
                let handle = self.read(&ctx, &last.path).await?.unwrap_or_else(|| last.clone());
                Some(Cursor::from_snapshot(handle))
            }
            None => None,
        };

        let total = if options.with_total {
            let count_query = options.apply_filters(self.base_query(), self.client.limits())?;
            Some(ctx.call(self.client.store().run_count(&count_query)).await?)
        } else {
            None
        };

        let data = snapshots
            .iter()
            .map(Document::from_snapshot)
            .collect::<Result<Vec<_>>>()?;
        Ok(PaginatedResult {
            data,
            has_more,
            cursor,
            total,
        })
    }

    /// Count documents matching `where_clauses`, server side
    pub async fn count(&self, ctx: &OpContext, where_clauses: &[WhereClause]) -> Result<u64> {
        let ctx = self.client.prepare(ctx);
        let options = QueryOptions {
            where_clauses: where_clauses.to_vec(),
            ..QueryOptions::default()
        };
        let query = options.apply_filters(self.base_query(), self.client.limits())?;
        ctx.call(self.client.store().run_count(&query)).await
    }

    // ========================================================================
    // Batches
    // ========================================================================

    /// Create every item atomically under store-generated ids
    ///
    /// Returns the new ids in input order. Empty input makes no store call.
    pub async fn batch_create(&self, ctx: &OpContext, items: &[T]) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(items.len());
        let mut ops = Vec::with_capacity(items.len());
        for item in items {
            let id = self.client.store().new_document_id(&self.path);
            ops.push(BatchOperation::set(self.path.doc(id.as_str())?, item.to_fields()));
            ids.push(id);
        }
        batch::commit(&self.client, ctx, ops).await?;
        Ok(ids)
    }

    /// Apply every `(id, partial)` update atomically
    ///
    /// Every target must exist; otherwise the store rejects the whole batch.
    pub async fn batch_update(&self, ctx: &OpContext, updates: Vec<(String, Fields)>) -> Result<()> {
        let ops = updates
            .into_iter()
            .map(|(id, partial)| -> Result<BatchOperation> {
                Ok(BatchOperation::update(self.doc_path(&id)?, partial))
            })
            .collect::<Result<Vec<_>>>()?;
        batch::commit(&self.client, ctx, ops).await
    }

    /// Delete every id atomically
    pub async fn batch_delete<S: AsRef<str>>(&self, ctx: &OpContext, ids: &[S]) -> Result<()> {
        let ops = ids
            .iter()
            .map(|id| -> Result<BatchOperation> { Ok(BatchOperation::delete(self.doc_path(id.as_ref())?)) })
            .collect::<Result<Vec<_>>>()?;
        batch::commit(&self.client, ctx, ops).await
    }

    /// Commit caller-assembled operations atomically
    ///
    /// Operations may target any document path, not only this collection.
    pub async fn batch(&self, ctx: &OpContext, ops: Vec<BatchOperation>) -> Result<()> {
        batch::commit(&self.client, ctx, ops).await
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Run `f` inside an optimistic transaction
    ///
    /// `f` receives a [`TransactionContext`] that reads and writes any
    /// document path. Its writes are applied atomically when it returns
    /// `Ok`; when it returns `Err` the transaction is rolled back and the
    /// error returned. A concurrent write to a document `f` read makes the
    /// commit fail with store code `aborted`, applying nothing.
    ///
    /// No retry happens here. Wrapping the call in
    /// [`with_retry`](crate::retry::with_retry) re-runs `f` from the start,
    /// so `f` must not have side effects beyond its transactional writes.
    ///
    /// ```no_run
    /// # use bazaar_core::{fields, Fields, Result};
    /// # use bazaar_engine::{CollectionService, OpContext};
    /// # async fn demo(accounts: CollectionService<Fields>) -> Result<()> {
    /// let from = accounts.doc_path("alice")?;
    /// accounts
    ///     .run_transaction(&OpContext::background(), move |tx| {
    ///         Box::pin(async move {
    ///             let current = tx.get::<Fields>(&from).await?;
    ///             let balance = current.and_then(|d| d.get("balance").and_then(|v| v.as_int())).unwrap_or(0);
    ///             tx.update(&from, fields! { "balance" => balance - 10 })?;
    ///             Ok(())
    ///         })
    ///     })
    ///     .await
    /// # }
    /// ```
    pub async fn run_transaction<R, F>(&self, ctx: &OpContext, f: F) -> Result<R>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut TransactionContext) -> BoxFuture<'t, Result<R>> + Send,
    {
        transaction::run(&self.client, ctx, f).await
    }
}
