//! Rankfuse: hybrid ranking engine
//!
//! Turns a free-text query into a ranked list of records by combining
//! independent retrieval signals:
//! - Semantic (vector) similarity with TTL-cached query embeddings
//! - Literal keyword matching in the store's native order
//! - Reciprocal Rank Fusion (RRF) merging both lists deterministically
//! - Optional LLM reranking that silently degrades to the fused order
//!
//! The engine is a library-level component: all five external
//! collaborators (embedding provider, vector store, keyword store, rerank
//! provider, cache store) are injected trait objects, so production
//! clients and test doubles plug in the same way. Retrieval failures are
//! typed; partial failure degrades only when the caller opts in.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use rankfuse::{EngineConfig, HybridSearcher, MemoryCacheStore, SearchOptions};
//! # use rankfuse::providers::{EmbeddingProvider, KeywordStore, VectorStore};
//! # async fn example(
//! #     embedder: Arc<dyn EmbeddingProvider>,
//! #     vector_store: Arc<dyn VectorStore>,
//! #     keyword_store: Arc<dyn KeywordStore>,
//! # ) -> anyhow::Result<()> {
//! let searcher = HybridSearcher::new(
//!     embedder,
//!     vector_store,
//!     keyword_store,
//!     Arc::new(MemoryCacheStore::new()),
//!     None,
//!     EngineConfig::default(),
//! );
//! let response = searcher.search("startup grant", &SearchOptions::default()).await?;
//! println!("{} results via {}", response.meta.total_results, response.meta.search_type);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use cache::{EmbeddingCache, MemoryCacheStore};
pub use config::{EngineConfig, SearchOptions, TimeoutConfig};
pub use retrieval::{
    fuse, HybridSearcher, KeywordRetriever, Reranker, RetrievalStage, SearchError,
    VectorRetriever,
};
pub use types::*;
