//! In-memory [`VectorStore`] for tests and throwaway sessions.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Nothing survives the
//! process, so the initialization flag lives in memory as well.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{CollectionInfo, Entry, QueryHit};

use super::{rank_nearest, VectorStore};

pub struct InMemoryStore {
    name: String,
    entries: RwLock<HashMap<String, Entry>>,
    initialized_at: RwLock<Option<i64>>,
}

impl InMemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            initialized_at: RwLock::new(None),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn collection(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, entry: &Entry) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(rank_nearest(
            vector,
            entries
                .values()
                .map(|e| (e.id.as_str(), e.document.as_str(), e.embedding.as_slice())),
            k,
        ))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.entries.read().map_err(poisoned)?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn is_initialized(&self) -> Result<bool> {
        Ok(self.initialized_at.read().map_err(poisoned)?.is_some())
    }

    async fn mark_initialized(&self) -> Result<()> {
        *self.initialized_at.write().map_err(poisoned)? = Some(chrono::Utc::now().timestamp());
        Ok(())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        Ok(CollectionInfo {
            name: self.name.clone(),
            space: "cosine".to_string(),
            hnsw_m: 32,
            initialized_at: *self.initialized_at.read().map_err(poisoned)?,
        })
    }
}
