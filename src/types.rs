//! Core types for the rankfuse engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Unique identifier for a search record
pub type RecordId = String;

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// A retrievable record as stored in the vector and keyword stores.
///
/// Read-only input from the engine's point of view; `similarity` is
/// populated only by vector retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: RecordId,
    pub title: String,
    pub organization: String,
    pub category: Option<String>,
    pub support_type: Option<String>,
    /// Free-text amount; never parsed by the engine
    pub support_amount: Option<String>,
    /// Application deadline, if the record has one
    pub deadline: Option<NaiveDate>,
    /// Provenance tag (e.g. "smes", "bizinfo", "kstartup")
    pub source: String,
    /// Similarity in [0,1], present only on vector-retrieved records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl SearchRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            organization: String::new(),
            category: None,
            support_type: None,
            support_amount: None,
            deadline: None,
            source: String::new(),
            similarity: None,
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }
}

/// A record after rank fusion.
///
/// Invariant: at least one of `vector_rank` / `keyword_rank` is present;
/// a record found by neither retriever is never materialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRecord {
    #[serde(flatten)]
    pub record: SearchRecord,
    /// 1-based position in the vector retrieval list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_rank: Option<usize>,
    /// 1-based position in the keyword retrieval list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_rank: Option<usize>,
    /// Reciprocal Rank Fusion score
    pub fusion_score: f32,
    /// LLM relevance score in [0,100], present only after a successful rerank
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl RankedRecord {
    /// True if the record was found by vector retrieval
    pub fn from_vector(&self) -> bool {
        self.vector_rank.is_some()
    }
}

/// Which retrieval paths produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Hybrid,
    VectorOnly,
    KeywordOnly,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Hybrid => write!(f, "hybrid"),
            SearchMode::VectorOnly => write!(f, "vector"),
            SearchMode::KeywordOnly => write!(f, "keyword"),
        }
    }
}

/// Observability metadata attached to every search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMeta {
    /// Echo of the query as received
    pub query: String,
    pub total_results: usize,
    /// Code path that produced the result
    pub search_type: SearchMode,
    /// Records returned by the vector retriever (0 if skipped or degraded away)
    pub vector_count: usize,
    /// Records returned by the keyword retriever (0 if skipped or degraded away)
    pub keyword_count: usize,
}

/// A ranked result set plus its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RankedRecord>,
    pub meta: SearchMeta,
}

/// Compact candidate representation sent to the rerank provider
#[derive(Debug, Clone, Serialize)]
pub struct RerankCandidate {
    pub id: RecordId,
    pub title: String,
    pub organization: String,
    pub category: Option<String>,
    pub support_amount: Option<String>,
}

impl From<&RankedRecord> for RerankCandidate {
    fn from(ranked: &RankedRecord) -> Self {
        Self {
            id: ranked.record.id.clone(),
            title: ranked.record.title.clone(),
            organization: ranked.record.organization.clone(),
            category: ranked.record.category.clone(),
            support_amount: ranked.record.support_amount.clone(),
        }
    }
}
