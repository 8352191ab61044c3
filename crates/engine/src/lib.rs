//! Typed access layer over the document store
//!
//! This crate is what domain services talk to:
//! - StoreClient: store handle plus configuration, cloned into every service
//! - CollectionService: CRUD, queries, pagination, counts, batches, scans
//! - SubcollectionService: the same surface scoped under a parent document,
//!   plus bulk delete and collection-group queries
//! - TransactionContext: optimistic multi-document transactions
//! - codec: application values to store-native values and back
//! - retry: error taxonomy and an opt-in retry wrapper
//!
//! Every operation takes an [`OpContext`] carrying a deadline and a
//! cancellation token. Service methods never retry.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod client;
pub mod codec;
pub mod collection;
pub mod config;
pub mod context;
pub mod document;
pub mod query;
pub mod record;
pub mod retry;
pub mod scan;
pub mod subcollection;
pub mod transaction;

pub use batch::BatchOperation;
pub use client::StoreClient;
pub use collection::{CollectionService, DEFAULT_PAGE_SIZE};
pub use config::{AccessConfig, ConfigError, CreatePolicy, RetryConfig, CONFIG_FILE_NAME};
pub use context::OpContext;
pub use document::Document;
pub use query::{Cursor, OrderByClause, PaginatedResult, QueryOptions, WhereClause};
pub use record::{FieldReader, Record};
pub use retry::{with_retry, ErrorKind, RetryPolicy};
pub use scan::{ScanPage, ScanRequest};
pub use subcollection::{GroupDocument, SubcollectionService};
pub use transaction::TransactionContext;
