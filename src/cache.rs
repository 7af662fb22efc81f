//! Query-embedding cache
//!
//! Memoizes query -> embedding lookups with a TTL so repeated queries skip
//! the embedding provider. Cache failures are never allowed to fail a
//! search: a read error is a miss, a write error is logged and dropped.

use crate::providers::CacheStore;
use crate::types::Embedding;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// TTL-bounded memoization of query embeddings over an injected store
pub struct EmbeddingCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    timeout: Duration,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            timeout,
        }
    }

    /// Derive the cache key for a query.
    ///
    /// SHA-256 of the exact query string; no normalization beyond what the
    /// caller already performed.
    pub fn cache_key(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        format!("embedding:{}", hex::encode(hasher.finalize()))
    }

    /// Look up the embedding for `query`. Errors and timeouts are misses.
    pub async fn get(&self, query: &str) -> Option<Embedding> {
        let key = Self::cache_key(query);
        match tokio::time::timeout(self.timeout, self.store.get(&key)).await {
            Ok(Ok(hit)) => hit,
            Ok(Err(e)) => {
                warn!("Cache read failed, treating as miss: {}", e);
                None
            }
            Err(_) => {
                warn!("Cache read timed out after {:?}, treating as miss", self.timeout);
                None
            }
        }
    }

    /// Store the embedding for `query`. Best-effort; errors are logged.
    pub async fn set(&self, query: &str, embedding: &[f32]) {
        let key = Self::cache_key(query);
        match tokio::time::timeout(self.timeout, self.store.set(&key, embedding, self.ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Cache write failed: {}", e),
            Err(_) => warn!("Cache write timed out after {:?}", self.timeout),
        }
    }
}

/// In-process cache store with passive expiry.
///
/// Entries past their deadline are simply not returned; nothing evicts
/// them eagerly. Suitable for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, (Embedding, Instant)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Embedding>> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|(_, deadline)| Instant::now() < *deadline)
            .map(|(embedding, _)| embedding.clone()))
    }

    async fn set(&self, key: &str, embedding: &[f32], ttl: Duration) -> Result<()> {
        let deadline = Instant::now() + ttl;
        self.entries
            .write()
            .insert(key.to_string(), (embedding.to_vec(), deadline));
        Ok(())
    }
}
