//! Access to a subcollection nested under every document of a parent
//! collection: `parentCollection/{parentId}/name/{childId}`

use crate::batch::{self, BatchOperation};
use crate::client::StoreClient;
use crate::collection::CollectionService;
use crate::context::OpContext;
use crate::document::Document;
use crate::query::{PaginatedResult, QueryOptions, WhereClause};
use crate::record::Record;
use crate::scan::{ScanPage, ScanRequest};
use bazaar_core::{CollectionPath, DocumentPath, Fields, Result};
use bazaar_storage::StoreQuery;
use std::fmt;
use std::marker::PhantomData;
use tracing::info;

/// A collection-group result together with the id of its parent
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDocument<T> {
    /// Id of the parent document
    pub parent_id: String,
    /// The child document
    pub document: Document<T>,
}

/// Access to the `name` subcollection of each document in a parent collection
pub struct SubcollectionService<T> {
    client: StoreClient,
    parent: CollectionPath,
    name: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for SubcollectionService<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            parent: self.parent.clone(),
            name: self.name.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SubcollectionService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubcollectionService")
            .field("parent", &self.parent)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: Record> SubcollectionService<T> {
    /// Service over `parent/{id}/name`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `name` is not a valid segment.
    pub fn new(client: StoreClient, parent: CollectionPath, name: &str) -> Result<Self> {
        CollectionPath::root(name)?;
        Ok(Self {
            client,
            parent,
            name: name.to_string(),
            _record: PhantomData,
        })
    }

    /// Subcollection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent collection path
    pub fn parent(&self) -> &CollectionPath {
        &self.parent
    }

    /// Collection service scoped to one parent's children
    pub fn for_parent(&self, parent_id: &str) -> Result<CollectionService<T>> {
        self.client.limits().validate_document_id(parent_id)?;
        let path = self.parent.doc(parent_id)?.collection(self.name.as_str())?;
        Ok(CollectionService::new(self.client.clone(), path))
    }

    /// Path of child `id` under `parent_id`
    pub fn doc_path(&self, parent_id: &str, id: &str) -> Result<DocumentPath> {
        self.for_parent(parent_id)?.doc_path(id)
    }

    /// Create a child with a store-generated id
    pub async fn create(&self, ctx: &OpContext, parent_id: &str, data: &T) -> Result<Document<T>> {
        self.for_parent(parent_id)?.create(ctx, data).await
    }

    /// Create or overwrite child `id`
    pub async fn create_with_id(&self, ctx: &OpContext, parent_id: &str, id: &str, data: &T) -> Result<Document<T>> {
        self.for_parent(parent_id)?.create_with_id(ctx, id, data).await
    }

    /// Read child `id`; `None` if it does not exist
    pub async fn get_by_id(&self, ctx: &OpContext, parent_id: &str, id: &str) -> Result<Option<Document<T>>> {
        self.for_parent(parent_id)?.get_by_id(ctx, id).await
    }

    /// Change fields of an existing child; `Error::NotFound` if it is absent
    pub async fn update(&self, ctx: &OpContext, parent_id: &str, id: &str, partial: Fields) -> Result<Document<T>> {
        self.for_parent(parent_id)?.update(ctx, id, partial).await
    }

    /// Delete child `id`
    pub async fn delete(&self, ctx: &OpContext, parent_id: &str, id: &str) -> Result<()> {
        self.for_parent(parent_id)?.delete(ctx, id).await
    }

    /// True if child `id` exists
    pub async fn exists(&self, ctx: &OpContext, parent_id: &str, id: &str) -> Result<bool> {
        self.for_parent(parent_id)?.exists(ctx, id).await
    }

    /// Query one parent's children
    pub async fn query(&self, ctx: &OpContext, parent_id: &str, options: &QueryOptions) -> Result<Vec<Document<T>>> {
        self.for_parent(parent_id)?.query(ctx, options).await
    }

    /// Query one parent's children a page at a time
    pub async fn query_paginated(
        &self,
        ctx: &OpContext,
        parent_id: &str,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<T>> {
        self.for_parent(parent_id)?.query_paginated(ctx, options).await
    }

    /// Count one parent's children matching `where_clauses`
    pub async fn count(&self, ctx: &OpContext, parent_id: &str, where_clauses: &[WhereClause]) -> Result<u64> {
        self.for_parent(parent_id)?.count(ctx, where_clauses).await
    }

    /// Create children atomically; returns their ids
    pub async fn batch_create(&self, ctx: &OpContext, parent_id: &str, items: &[T]) -> Result<Vec<String>> {
        self.for_parent(parent_id)?.batch_create(ctx, items).await
    }

    /// Update children atomically
    pub async fn batch_update(&self, ctx: &OpContext, parent_id: &str, updates: Vec<(String, Fields)>) -> Result<()> {
        self.for_parent(parent_id)?.batch_update(ctx, updates).await
    }

    /// Delete children atomically
    pub async fn batch_delete<S: AsRef<str>>(&self, ctx: &OpContext, parent_id: &str, ids: &[S]) -> Result<()> {
        self.for_parent(parent_id)?.batch_delete(ctx, ids).await
    }

    /// Approximate scan over one parent's children
    pub async fn scan(&self, ctx: &OpContext, parent_id: &str, request: &ScanRequest<T>) -> Result<ScanPage<T>> {
        self.for_parent(parent_id)?.scan(ctx, request).await
    }

    /// Delete every child of `parent_id` in one atomic batch
    ///
    /// Returns the number of deleted children. If there are more children
    /// than one batch may hold, fails with `BatchTooLarge` and deletes
    /// nothing; callers must delete in chunks.
    pub async fn delete_all(&self, ctx: &OpContext, parent_id: &str) -> Result<usize> {
        let children = self.for_parent(parent_id)?;
        let ctx = self.client.prepare(ctx);
        let query = StoreQuery::collection(children.path().clone());
        let snapshots = ctx.call(self.client.store().run_query(&query)).await?;

        let ops: Vec<BatchOperation> = snapshots
            .into_iter()
            .map(|s| BatchOperation::delete(s.path))
            .collect();
        let count = ops.len();
        batch::commit(&self.client, &ctx, ops).await?;
        info!(
            target: "bazaar::collection",
            collection = %children.path(),
            deleted = count,
            "Subcollection cleared"
        );
        Ok(count)
    }

    /// Query this subcollection across every parent
    ///
    /// Collection-group queries span every collection named like this
    /// subcollection. Documents of a top-level collection with the same
    /// name have no parent and are skipped.
    pub async fn query_group(&self, ctx: &OpContext, options: &QueryOptions) -> Result<Vec<GroupDocument<T>>> {
        let ctx = self.client.prepare(ctx);
        let query = options.apply(
            StoreQuery::collection_group(self.name.clone()),
            self.client.limits(),
        )?;
        let snapshots = ctx.call(self.client.store().run_query(&query)).await?;

        snapshots
            .iter()
            .filter_map(|s| {
                let parent = s.path.parent().parent()?;
                Some((parent.id().to_string(), s))
            })
            .map(|(parent_id, s)| -> Result<GroupDocument<T>> {
                Ok(GroupDocument {
                    parent_id,
                    document: Document::from_snapshot(s)?,
                })
            })
            .collect()
    }
}
