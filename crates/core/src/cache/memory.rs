//! Process-local cache store.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use super::CacheStore;
use crate::Error;
use crate::model::{CacheKey, StoredResponse};

#[derive(Debug, Default)]
struct Generation {
    name: String,
    entries: BTreeMap<CacheKey, StoredResponse>,
}

/// In-memory [`CacheStore`].
///
/// Generations are kept in creation order. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    generations: RwLock<Vec<Generation>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a generation, zero if it doesn't exist.
    pub async fn len(&self, generation: &str) -> usize {
        self.generations
            .read()
            .await
            .iter()
            .find(|g| g.name == generation)
            .map_or(0, |g| g.entries.len())
    }
}

fn open_in(generations: &mut Vec<Generation>, name: &str) -> usize {
    match generations.iter().position(|g| g.name == name) {
        Some(idx) => idx,
        None => {
            generations.push(Generation { name: name.to_string(), entries: BTreeMap::new() });
            generations.len() - 1
        }
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        open_in(&mut *self.generations.write().await, generation);
        Ok(())
    }

    async fn lookup(&self, key: &CacheKey, generation: Option<&str>) -> Result<Option<StoredResponse>, Error> {
        let generations = self.generations.read().await;
        let found = match generation {
            Some(name) => generations
                .iter()
                .find(|g| g.name == name)
                .and_then(|g| g.entries.get(key)),
            None => generations
                .iter()
                .filter_map(|g| g.entries.get(key))
                .max_by(|a, b| a.stored_at.cmp(&b.stored_at)),
        };
        Ok(found.cloned())
    }

    async fn put(&self, generation: &str, key: &CacheKey, response: &StoredResponse) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        let idx = open_in(&mut generations, generation);
        generations[idx].entries.insert(key.clone(), response.clone());
        Ok(())
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let mut generations = self.generations.write().await;
        let before = generations.len();
        generations.retain(|g| g.name != generation);
        Ok(generations.len() != before)
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        Ok(self.generations.read().await.iter().map(|g| g.name.clone()).collect())
    }

    async fn keys(&self, generation: &str) -> Result<Vec<CacheKey>, Error> {
        Ok(self
            .generations
            .read()
            .await
            .iter()
            .find(|g| g.name == generation)
            .map(|g| g.entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
