//! Shared helpers for the scenario suites.

#![allow(dead_code)]

use bazaar::{CollectionService, Fields, MemoryStore, OpContext, StoreClient, StoreQuery};
use bazaar::{CollectionPath, DocumentSnapshot, DocumentStore};
use std::sync::Arc;

/// Client over a fresh memory store, keeping the store for inspection
pub fn setup() -> (StoreClient, Arc<MemoryStore>) {
    bazaar::init_logging("warn");
    let store = Arc::new(MemoryStore::new());
    (StoreClient::new(store.clone()), store)
}

pub fn items(client: &StoreClient) -> CollectionService<Fields> {
    client.collection::<Fields>("items").unwrap()
}

pub fn ctx() -> OpContext {
    OpContext::background()
}

/// Every stored snapshot of collection `name`, in id order
pub async fn dump(store: &MemoryStore, name: &str) -> Vec<DocumentSnapshot> {
    let query = StoreQuery::collection(CollectionPath::root(name).unwrap());
    store.run_query(&query).await.unwrap()
}

/// Run `fut` to completion on a fresh current-thread runtime
pub fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}
