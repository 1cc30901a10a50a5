//! Generational response cache.
//!
//! Entries are grouped into named generations and keyed by request identity.
//! Two backends implement [`CacheStore`]:
//!
//! - [`CacheDb`]: persistent SQLite store with async access via tokio-rusqlite,
//!   WAL mode and automatic schema migrations
//! - [`MemoryCache`]: process-local store for tests and ephemeral runs

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod memory;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryCache;

use crate::model::{CacheKey, StoredResponse};

/// Capability over a generational cache store.
///
/// Writes are whole-entry overwrites; concurrent writers to the same key
/// resolve as last-writer-wins.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation if it does not exist yet.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Find the entry for `key` in one generation, or in any generation when
    /// `generation` is `None`.
    async fn lookup(&self, key: &CacheKey, generation: Option<&str>) -> Result<Option<StoredResponse>, Error>;

    /// Store `response` under `key`, replacing any previous entry. Opens the
    /// generation if needed.
    async fn put(&self, generation: &str, key: &CacheKey, response: &StoredResponse) -> Result<(), Error>;

    /// Delete a generation and all of its entries. Returns whether it existed.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    /// Names of all existing generations, oldest first.
    async fn names(&self) -> Result<Vec<String>, Error>;

    /// Keys stored in one generation.
    async fn keys(&self, generation: &str) -> Result<Vec<CacheKey>, Error>;
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.open_generation(generation).await
    }

    async fn lookup(&self, key: &CacheKey, generation: Option<&str>) -> Result<Option<StoredResponse>, Error> {
        self.get_entry(key, generation).await
    }

    async fn put(&self, generation: &str, key: &CacheKey, response: &StoredResponse) -> Result<(), Error> {
        self.upsert_entry(generation, key, response).await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.delete_generation(generation).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.generation_names().await
    }

    async fn keys(&self, generation: &str) -> Result<Vec<CacheKey>, Error> {
        self.list_keys(generation).await
    }
}
