//! Collaborator trait definitions
//!
//! All traits are object-safe and `Send + Sync` so they can be shared as
//! `Arc<dyn Trait>` across concurrent searches.

use crate::types::{Embedding, RecordId, RerankCandidate, SearchRecord};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Turns text into a fixed-length numeric vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embedding dimensionality, constant across calls
    fn dimensions(&self) -> usize;
}

/// Nearest-neighbor lookup over pre-ingested records.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `top_n` records with `similarity >= min_similarity`,
    /// sorted descending by similarity (stable for equal similarities).
    /// Every returned record carries its similarity.
    async fn nearest(
        &self,
        embedding: &[f32],
        top_n: usize,
        min_similarity: f32,
    ) -> Result<Vec<SearchRecord>>;
}

/// Literal keyword match over the configured text fields.
#[async_trait]
pub trait KeywordStore: Send + Sync {
    /// Return up to `top_n` records containing `query`, in the store's
    /// native relevance order.
    async fn matching(&self, query: &str, top_n: usize) -> Result<Vec<SearchRecord>>;
}

/// LLM relevance judgment over a batch of candidates.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Score every candidate 0-100 for relevance to `query`.
    ///
    /// Coverage is best-effort: the returned map may omit ids.
    async fn score(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
    ) -> Result<HashMap<RecordId, f32>>;
}

/// Key/value store with per-entry expiry. No consistency requirement.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Embedding>>;

    async fn set(&self, key: &str, embedding: &[f32], ttl: Duration) -> Result<()>;
}
