//! Hybrid search orchestration

use super::{fuse, KeywordRetriever, Reranker, SearchError, VectorRetriever};
use crate::cache::EmbeddingCache;
use crate::config::{EngineConfig, SearchOptions};
use crate::providers::{
    CacheStore, EmbeddingProvider, KeywordStore, RerankProvider, VectorStore,
};
use crate::types::{RankedRecord, SearchMeta, SearchMode, SearchResponse};
use std::sync::Arc;
use tracing::{info, warn};

/// Hybrid search engine combining vector and keyword retrieval.
///
/// Stateless apart from the injected collaborators: one instance serves
/// any number of concurrent searches.
pub struct HybridSearcher {
    vector: VectorRetriever,
    keyword: KeywordRetriever,
    reranker: Option<Reranker>,
    config: EngineConfig,
}

impl HybridSearcher {
    /// Wire a searcher from its collaborators.
    ///
    /// `rerank_provider` is optional; without one, `use_rerank` requests
    /// are logged and skipped.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        keyword_store: Arc<dyn KeywordStore>,
        cache_store: Arc<dyn CacheStore>,
        rerank_provider: Option<Arc<dyn RerankProvider>>,
        config: EngineConfig,
    ) -> Self {
        let cache = EmbeddingCache::new(
            cache_store,
            config.cache.ttl(),
            config.timeouts.cache(),
        );
        Self {
            vector: VectorRetriever::new(
                embedder,
                vector_store,
                cache,
                config.timeouts.clone(),
            ),
            keyword: KeywordRetriever::new(keyword_store, config.timeouts.clone()),
            reranker: rerank_provider
                .map(|provider| Reranker::new(provider, config.timeouts.rerank())),
            config,
        }
    }

    /// Run a hybrid search: both retrievers concurrently, RRF fusion,
    /// optional rerank, truncation to `options.limit`.
    ///
    /// When exactly one retriever fails the behavior depends on
    /// `options.allow_degraded`: opted in, the search proceeds on the
    /// surviving list and `meta.search_type` reports the degraded path;
    /// otherwise the failure propagates. Both failing always propagates.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        options
            .validate()
            .map_err(|e| SearchError::InvalidOptions(e.to_string()))?;

        let candidate_count = self.config.retrieval.candidate_count;

        // Independent retrievals, polled concurrently in this task: if the
        // caller drops the search future, both branches are cancelled with
        // it, so no orphaned work is left behind.
        let (vector_result, keyword_result) = tokio::join!(
            self.vector
                .retrieve(query, candidate_count, options.match_threshold),
            self.keyword.retrieve(query, candidate_count),
        );

        let (vector_list, keyword_list, mode) = match (vector_result, keyword_result) {
            (Ok(vector_list), Ok(keyword_list)) => {
                (vector_list, keyword_list, SearchMode::Hybrid)
            }
            (Ok(vector_list), Err(e)) if options.allow_degraded => {
                warn!("Keyword retrieval failed, degrading to vector-only: {}", e);
                (vector_list, Vec::new(), SearchMode::VectorOnly)
            }
            (Err(e), Ok(keyword_list)) if options.allow_degraded => {
                warn!("Vector retrieval failed, degrading to keyword-only: {}", e);
                (Vec::new(), keyword_list, SearchMode::KeywordOnly)
            }
            (Err(vector), Err(keyword)) => {
                return Err(SearchError::BothRetrieversFailed {
                    vector: Box::new(vector),
                    keyword: Box::new(keyword),
                })
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
        };

        let vector_count = vector_list.len();
        let keyword_count = keyword_list.len();

        let mut results = fuse(vector_list, keyword_list, options.rrf_k);

        if options.use_rerank {
            match &self.reranker {
                Some(reranker) => {
                    results = reranker
                        .rerank(query, results, options.rerank_prefix_size)
                        .await;
                }
                None => warn!("use_rerank requested but no rerank provider is configured"),
            }
        }

        results.truncate(options.limit);

        info!(
            "Hybrid search for '{}': {} results ({})",
            truncate_for_log(query, 50),
            results.len(),
            mode
        );

        Ok(SearchResponse {
            meta: SearchMeta {
                query: query.to_string(),
                total_results: results.len(),
                search_type: mode,
                vector_count,
                keyword_count,
            },
            results,
        })
    }

    /// Vector-only search: no keyword retrieval, no fusion. The record's
    /// similarity doubles as its score so the response shape matches
    /// hybrid search.
    pub async fn vector_only(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        options
            .validate()
            .map_err(|e| SearchError::InvalidOptions(e.to_string()))?;

        let records = self
            .vector
            .retrieve(query, options.limit, options.match_threshold)
            .await?;

        let results: Vec<RankedRecord> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let score = record.similarity.unwrap_or(0.0);
                RankedRecord {
                    record,
                    vector_rank: Some(index + 1),
                    keyword_rank: None,
                    fusion_score: score,
                    rerank_score: None,
                }
            })
            .collect();

        info!(
            "Vector search for '{}': {} results",
            truncate_for_log(query, 50),
            results.len()
        );

        Ok(SearchResponse {
            meta: SearchMeta {
                query: query.to_string(),
                total_results: results.len(),
                search_type: SearchMode::VectorOnly,
                vector_count: results.len(),
                keyword_count: 0,
            },
            results,
        })
    }

    /// Keyword-only search: no vector retrieval, no fusion. Every record
    /// scores 1.0; the keyword store only provides an order.
    pub async fn keyword_only(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        options
            .validate()
            .map_err(|e| SearchError::InvalidOptions(e.to_string()))?;

        let records = self.keyword.retrieve(query, options.limit).await?;

        let results: Vec<RankedRecord> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| RankedRecord {
                record,
                vector_rank: None,
                keyword_rank: Some(index + 1),
                fusion_score: 1.0,
                rerank_score: None,
            })
            .collect();

        info!(
            "Keyword search for '{}': {} results",
            truncate_for_log(query, 50),
            results.len()
        );

        Ok(SearchResponse {
            meta: SearchMeta {
                query: query.to_string(),
                total_results: results.len(),
                search_type: SearchMode::KeywordOnly,
                vector_count: 0,
                keyword_count: results.len(),
            },
            results,
        })
    }
}

/// Truncate a query for a log line, respecting char boundaries
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_len).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::types::{Embedding, RecordId, RerankCandidate, SearchRecord};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Embedding> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct StaticVectorStore {
        records: Vec<SearchRecord>,
        calls: AtomicUsize,
    }

    impl StaticVectorStore {
        fn new(records: Vec<SearchRecord>) -> Arc<Self> {
            Arc::new(Self {
                records,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VectorStore for StaticVectorStore {
        async fn nearest(
            &self,
            _embedding: &[f32],
            top_n: usize,
            min_similarity: f32,
        ) -> Result<Vec<SearchRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .records
                .iter()
                .filter(|r| r.similarity.unwrap_or(0.0) >= min_similarity)
                .take(top_n)
                .cloned()
                .collect())
        }
    }

    struct FailingVectorStore;

    #[async_trait]
    impl VectorStore for FailingVectorStore {
        async fn nearest(
            &self,
            _embedding: &[f32],
            _top_n: usize,
            _min_similarity: f32,
        ) -> Result<Vec<SearchRecord>> {
            Err(anyhow!("vector store down"))
        }
    }

    struct StaticKeywordStore {
        records: Vec<SearchRecord>,
    }

    impl StaticKeywordStore {
        fn new(records: Vec<SearchRecord>) -> Arc<Self> {
            Arc::new(Self { records })
        }
    }

    #[async_trait]
    impl KeywordStore for StaticKeywordStore {
        async fn matching(&self, _query: &str, top_n: usize) -> Result<Vec<SearchRecord>> {
            Ok(self.records.iter().take(top_n).cloned().collect())
        }
    }

    struct FailingKeywordStore;

    #[async_trait]
    impl KeywordStore for FailingKeywordStore {
        async fn matching(&self, _query: &str, _top_n: usize) -> Result<Vec<SearchRecord>> {
            Err(anyhow!("keyword store down"))
        }
    }

    struct StaticScores {
        scores: HashMap<RecordId, f32>,
    }

    #[async_trait]
    impl RerankProvider for StaticScores {
        async fn score(
            &self,
            _query: &str,
            _candidates: &[RerankCandidate],
        ) -> Result<HashMap<RecordId, f32>> {
            Ok(self.scores.clone())
        }
    }

    struct FailingRerankProvider;

    #[async_trait]
    impl RerankProvider for FailingRerankProvider {
        async fn score(
            &self,
            _query: &str,
            _candidates: &[RerankCandidate],
        ) -> Result<HashMap<RecordId, f32>> {
            Err(anyhow!("rerank provider down"))
        }
    }

    fn vector_records() -> Vec<SearchRecord> {
        vec![
            SearchRecord::new("A", "semantic first").with_similarity(0.9),
            SearchRecord::new("B", "semantic second").with_similarity(0.7),
        ]
    }

    fn keyword_records() -> Vec<SearchRecord> {
        vec![
            SearchRecord::new("B", "keyword first"),
            SearchRecord::new("C", "keyword second"),
        ]
    }

    fn searcher(
        vector_store: Arc<dyn VectorStore>,
        keyword_store: Arc<dyn KeywordStore>,
        rerank_provider: Option<Arc<dyn RerankProvider>>,
    ) -> HybridSearcher {
        HybridSearcher::new(
            CountingEmbedder::new(),
            vector_store,
            keyword_store,
            Arc::new(MemoryCacheStore::new()),
            rerank_provider,
            EngineConfig::default(),
        )
    }

    fn default_searcher() -> HybridSearcher {
        searcher(
            StaticVectorStore::new(vector_records()),
            StaticKeywordStore::new(keyword_records()),
            None,
        )
    }

    #[tokio::test]
    async fn test_hybrid_search_fuses_both_lists() {
        let response = default_searcher()
            .search("support", &SearchOptions::default())
            .await
            .unwrap();

        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "A", "C"]);

        assert_eq!(response.meta.search_type, SearchMode::Hybrid);
        assert_eq!(response.meta.vector_count, 2);
        assert_eq!(response.meta.keyword_count, 2);
        assert_eq!(response.meta.total_results, 3);
        assert_eq!(response.meta.query, "support");
    }

    #[tokio::test]
    async fn test_truncation_to_limit() {
        let options = SearchOptions {
            limit: 2,
            ..Default::default()
        };

        let response = default_searcher().search("support", &options).await.unwrap();

        assert_eq!(response.results.len(), 2);
        // The prefix of the fused order, not an arbitrary subset
        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_both_retrievers_failing_is_an_error() {
        let searcher = searcher(
            Arc::new(FailingVectorStore),
            Arc::new(FailingKeywordStore),
            None,
        );

        let err = searcher
            .search("support", &SearchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::BothRetrieversFailed { .. }));
    }

    #[tokio::test]
    async fn test_single_failure_propagates_without_opt_in() {
        let searcher = searcher(
            Arc::new(FailingVectorStore),
            StaticKeywordStore::new(keyword_records()),
            None,
        );

        let err = searcher
            .search("support", &SearchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::RetrievalFailed { .. }));
    }

    #[tokio::test]
    async fn test_degraded_mode_survives_vector_failure() {
        let searcher = searcher(
            Arc::new(FailingVectorStore),
            StaticKeywordStore::new(keyword_records()),
            None,
        );
        let options = SearchOptions {
            allow_degraded: true,
            ..Default::default()
        };

        let response = searcher.search("support", &options).await.unwrap();

        assert_eq!(response.meta.search_type, SearchMode::KeywordOnly);
        assert_eq!(response.meta.vector_count, 0);
        assert_eq!(response.meta.keyword_count, 2);
        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_degraded_mode_survives_keyword_failure() {
        let searcher = searcher(
            StaticVectorStore::new(vector_records()),
            Arc::new(FailingKeywordStore),
            None,
        );
        let options = SearchOptions {
            allow_degraded: true,
            ..Default::default()
        };

        let response = searcher.search("support", &options).await.unwrap();

        assert_eq!(response.meta.search_type, SearchMode::VectorOnly);
        assert_eq!(response.meta.keyword_count, 0);
        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_any_call() {
        let embedder = CountingEmbedder::new();
        let vector_store = StaticVectorStore::new(vector_records());
        let searcher = HybridSearcher::new(
            embedder.clone(),
            vector_store.clone(),
            StaticKeywordStore::new(keyword_records()),
            Arc::new(MemoryCacheStore::new()),
            None,
            EngineConfig::default(),
        );

        let options = SearchOptions {
            limit: 0,
            ..Default::default()
        };
        let err = searcher.search("support", &options).await.unwrap_err();

        assert!(matches!(err, SearchError::InvalidOptions(_)));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(vector_store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rerank_reorders_prefix() {
        let scores: HashMap<RecordId, f32> =
            [("A", 95.0), ("B", 10.0), ("C", 50.0)]
                .iter()
                .map(|(id, score)| (id.to_string(), *score))
                .collect();
        let searcher = searcher(
            StaticVectorStore::new(vector_records()),
            StaticKeywordStore::new(keyword_records()),
            Some(Arc::new(StaticScores { scores })),
        );
        let options = SearchOptions {
            use_rerank: true,
            ..Default::default()
        };

        let response = searcher.search("support", &options).await.unwrap();

        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "C", "B"]);
        assert_eq!(response.results[0].rerank_score, Some(95.0));
    }

    #[tokio::test]
    async fn test_rerank_failure_keeps_fused_order() {
        let searcher = searcher(
            StaticVectorStore::new(vector_records()),
            StaticKeywordStore::new(keyword_records()),
            Some(Arc::new(FailingRerankProvider)),
        );
        let options = SearchOptions {
            use_rerank: true,
            ..Default::default()
        };

        let response = searcher.search("support", &options).await.unwrap();

        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        assert!(response.results.iter().all(|r| r.rerank_score.is_none()));
    }

    #[tokio::test]
    async fn test_use_rerank_without_provider_is_skipped() {
        let options = SearchOptions {
            use_rerank: true,
            ..Default::default()
        };

        let response = default_searcher().search("support", &options).await.unwrap();

        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_vector_only_uses_similarity_as_score() {
        let response = default_searcher()
            .vector_only("support", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(response.meta.search_type, SearchMode::VectorOnly);
        assert_eq!(response.meta.keyword_count, 0);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].fusion_score, 0.9);
        assert_eq!(response.results[0].vector_rank, Some(1));
        assert_eq!(response.results[1].fusion_score, 0.7);
    }

    #[tokio::test]
    async fn test_keyword_only_scores_one() {
        let response = default_searcher()
            .keyword_only("support", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(response.meta.search_type, SearchMode::KeywordOnly);
        assert_eq!(response.meta.vector_count, 0);
        assert!(response.results.iter().all(|r| r.fusion_score == 1.0));
        assert_eq!(response.results[0].keyword_rank, Some(1));
        assert_eq!(response.results[1].keyword_rank, Some(2));
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 50), "short");
        let long = "q".repeat(60);
        let truncated = truncate_for_log(&long, 50);
        assert_eq!(truncated.len(), 53);
        assert!(truncated.ends_with("..."));
    }
}
