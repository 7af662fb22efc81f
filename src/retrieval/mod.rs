//! Hybrid retrieval pipeline
//!
//! Combines:
//! - Vector (semantic) retrieval with cached query embeddings
//! - Keyword retrieval in the store's native order
//! - Reciprocal Rank Fusion (RRF) for rank aggregation
//! - Optional LLM reranking with silent fallback to the fused order

mod fusion;
mod hybrid;
mod keyword;
mod reranker;
mod vector;

pub use fusion::*;
pub use hybrid::*;
pub use keyword::*;
pub use reranker::*;
pub use vector::*;

use std::fmt;
use thiserror::Error;

/// Which external stage failed during retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStage {
    Embedding,
    VectorStore,
    KeywordStore,
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalStage::Embedding => write!(f, "embedding"),
            RetrievalStage::VectorStore => write!(f, "vector store"),
            RetrievalStage::KeywordStore => write!(f, "keyword store"),
        }
    }
}

/// Errors surfaced by the search engine.
///
/// Cache and rerank failures never appear here; they are absorbed where
/// they occur.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Options rejected before any external call was made
    #[error("invalid search options: {0}")]
    InvalidOptions(String),

    /// An external retrieval stage failed or timed out
    #[error("{stage} retrieval failed: {source}")]
    RetrievalFailed {
        stage: RetrievalStage,
        #[source]
        source: anyhow::Error,
    },

    /// Neither retriever produced a signal to fuse
    #[error("both retrievers failed; vector: {vector}; keyword: {keyword}")]
    BothRetrieversFailed {
        vector: Box<SearchError>,
        keyword: Box<SearchError>,
    },
}

impl SearchError {
    pub(crate) fn retrieval(stage: RetrievalStage, source: anyhow::Error) -> Self {
        SearchError::RetrievalFailed { stage, source }
    }

    /// The failed stage, when the error identifies one
    pub fn stage(&self) -> Option<RetrievalStage> {
        match self {
            SearchError::RetrievalFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
