//! Semantic retrieval via embedding + vector store

use super::{RetrievalStage, SearchError};
use crate::cache::EmbeddingCache;
use crate::config::TimeoutConfig;
use crate::providers::{EmbeddingProvider, VectorStore};
use crate::types::SearchRecord;
use anyhow::anyhow;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::debug;

/// Retrieves records by semantic similarity.
///
/// Wraps the embedding provider and vector store; query embeddings go
/// through the [`EmbeddingCache`] so repeated queries skip the provider.
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    cache: EmbeddingCache,
    timeouts: TimeoutConfig,
}

impl VectorRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        cache: EmbeddingCache,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            cache,
            timeouts,
        }
    }

    /// Retrieve up to `top_n` records with `similarity >= match_threshold`,
    /// ordered descending by similarity (rank = position + 1).
    ///
    /// Does not degrade internally: losing the whole semantic signal is a
    /// caller-level policy decision, so embedding and store failures
    /// surface as typed errors. Timeouts are failures.
    pub async fn retrieve(
        &self,
        query: &str,
        top_n: usize,
        match_threshold: f32,
    ) -> Result<Vec<SearchRecord>, SearchError> {
        let embedding = match self.cache.get(query).await {
            Some(hit) => {
                debug!("Embedding cache hit");
                hit
            }
            None => {
                let embedding = timeout(self.timeouts.embedding(), self.embedder.embed(query))
                    .await
                    .map_err(|_| {
                        SearchError::retrieval(
                            RetrievalStage::Embedding,
                            anyhow!("timed out after {:?}", self.timeouts.embedding()),
                        )
                    })?
                    .map_err(|e| SearchError::retrieval(RetrievalStage::Embedding, e))?;
                self.cache.set(query, &embedding).await;
                embedding
            }
        };

        let records = timeout(
            self.timeouts.vector_store(),
            self.store.nearest(&embedding, top_n, match_threshold),
        )
        .await
        .map_err(|_| {
            SearchError::retrieval(
                RetrievalStage::VectorStore,
                anyhow!("timed out after {:?}", self.timeouts.vector_store()),
            )
        })?
        .map_err(|e| SearchError::retrieval(RetrievalStage::VectorStore, e))?;

        // Store contract: results arrive sorted descending with
        // similarity >= match_threshold. The retriever does not re-sort or
        // re-filter, and must not silently widen the threshold.
        debug_assert!(
            records
                .iter()
                .all(|r| r.similarity.unwrap_or(0.0) >= match_threshold),
            "vector store returned a record below the similarity floor"
        );

        debug!("Vector search: {} results", records.len());
        Ok(records)
    }
}
