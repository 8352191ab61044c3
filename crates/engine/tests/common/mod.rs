//! Shared fixtures for the engine integration suites.
//!
//! Import via `mod common;` from any test file.

#![allow(dead_code)]

use bazaar_core::{fields, Fields, Result};
use bazaar_engine::{AccessConfig, FieldReader, OpContext, Record, StoreClient};
use bazaar_storage::MemoryStore;
use std::sync::Arc;

// ============================================================================
// Records
// ============================================================================

/// Marketplace listing
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub title: String,
    pub price: i64,
    pub status: String,
    pub tags: Vec<String>,
}

impl Record for Listing {
    fn to_fields(&self) -> Fields {
        fields! {
            "title" => self.title.as_str(),
            "price" => self.price,
            "status" => self.status.as_str(),
            "tags" => self.tags.clone(),
        }
    }

    fn from_fields(fields: &Fields) -> Result<Self> {
        let r = FieldReader::new(fields);
        Ok(Listing {
            title: r.string("title")?,
            price: r.int("price")?,
            status: r.string("status")?,
            tags: r.strings("tags")?,
        })
    }
}

pub fn listing(title: &str, price: i64) -> Listing {
    Listing {
        title: title.to_string(),
        price,
        status: "active".to_string(),
        tags: Vec::new(),
    }
}

/// Account with a balance, for transfer scenarios
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub owner: String,
    pub balance: i64,
}

impl Record for Account {
    fn to_fields(&self) -> Fields {
        fields! { "owner" => self.owner.as_str(), "balance" => self.balance }
    }

    fn from_fields(fields: &Fields) -> Result<Self> {
        let r = FieldReader::new(fields);
        Ok(Account {
            owner: r.string("owner")?,
            balance: r.int("balance")?,
        })
    }
}

pub fn account(owner: &str, balance: i64) -> Account {
    Account {
        owner: owner.to_string(),
        balance,
    }
}

/// Message posted under a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub author: String,
    pub body: String,
}

impl Record for Message {
    fn to_fields(&self) -> Fields {
        fields! { "author" => self.author.as_str(), "body" => self.body.as_str() }
    }

    fn from_fields(fields: &Fields) -> Result<Self> {
        let r = FieldReader::new(fields);
        Ok(Message {
            author: r.string("author")?,
            body: r.string("body")?,
        })
    }
}

pub fn message(author: &str, body: &str) -> Message {
    Message {
        author: author.to_string(),
        body: body.to_string(),
    }
}

// ============================================================================
// Clients
// ============================================================================

/// Client over a fresh memory store, keeping the store for inspection
pub fn setup() -> (StoreClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (StoreClient::new(store.clone()), store)
}

/// Client over a fresh memory store with an explicit configuration
pub fn setup_with(config: AccessConfig) -> (StoreClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let client = StoreClient::with_config(store.clone(), config).expect("valid config");
    (client, store)
}

pub fn ctx() -> OpContext {
    OpContext::background()
}
