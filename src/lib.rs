//! Bazaar - typed async access to a hierarchical document store
//!
//! Domain services describe their records once (a [`Record`] impl) and get
//! CRUD, queries, cursor pagination, counts, atomic batches, optimistic
//! transactions and bounded scans over any collection or subcollection.
//!
//! # Quick Start
//!
//! ```no_run
//! use bazaar::{fields, Fields, StoreClient};
//!
//! # async fn demo() -> bazaar::Result<()> {
//! let client = StoreClient::in_memory();
//! let listings = client.collection::<Fields>("listings")?;
//!
//! let ctx = client.context();
//! let doc = listings.create(&ctx, &fields! { "title" => "Oak desk", "price" => 120 }).await?;
//! let updated = listings.update(&ctx, &doc.id, fields! { "price" => 99 }).await?;
//! assert!(updated.updated_at >= doc.updated_at);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `bazaar-core`: values, paths, limits, errors
//! - `bazaar-storage`: the [`DocumentStore`] contract and [`MemoryStore`]
//! - `bazaar-engine`: the typed services built on the contract

pub use bazaar_core::{
    fields, CollectionPath, Direction, DocumentPath, Error, Fields, FilterOp, LimitError, Limits, Result,
    StoreCode, StoreError, Timestamp, Value, CREATED_AT, UPDATED_AT,
};
pub use bazaar_engine::*;
pub use bazaar_storage::{
    DocumentSnapshot, DocumentStore, IndexDefinition, IndexPolicy, MemoryStore, NativeMap, NativeValue,
    StoreQuery, StoreStats, TransactionId, Write,
};

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `false` if a
/// subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .is_ok()
}
