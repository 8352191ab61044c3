//! Document store contract and in-memory backend
//!
//! This crate defines what the access layer needs from the remote store:
//! - NativeValue: the store's own value representation
//! - DocumentSnapshot: a read document, usable as a query cursor
//! - StoreQuery: filter / order / cursor / limit over one collection or a
//!   collection group
//! - Write: a single set / update / delete inside an atomic commit
//! - DocumentStore: the async contract (reads, queries, counts, atomic
//!   commits, optimistic transactions)
//!
//! `MemoryStore` implements the contract in process. It enforces the same
//! constraints a remote store does (batch size limit, update preconditions,
//! read-set conflict detection, optional composite indexes) and supports
//! fault injection for atomicity tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod native;
pub mod query;
pub mod snapshot;
pub mod traits;
pub mod write;

pub use memory::{IndexDefinition, IndexPolicy, MemoryStore, StoreStats};
pub use native::{NativeMap, NativeValue};
pub use query::{Bound, FieldFilter, FieldOrder, QueryScope, StoreQuery, DOCUMENT_ID_FIELD};
pub use snapshot::DocumentSnapshot;
pub use traits::{DocumentStore, StoreResult, TransactionId};
pub use write::Write;
