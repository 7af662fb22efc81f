//! Engine and per-call configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Per-call search options.
///
/// Unknown fields are rejected so a typo in a caller's JSON payload fails
/// loudly instead of silently falling back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchOptions {
    /// Final result count
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Minimum vector similarity to accept (0.0-1.0)
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
    /// RRF damping constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
    /// Run the LLM reranking pass over the fused prefix
    #[serde(default)]
    pub use_rerank: bool,
    /// How many fused results are sent to the reranker
    #[serde(default = "default_rerank_prefix_size")]
    pub rerank_prefix_size: usize,
    /// Proceed with the surviving list when exactly one retriever fails.
    /// Off by default: partial failure propagates unless the caller opts in.
    #[serde(default)]
    pub allow_degraded: bool,
}

fn default_limit() -> usize {
    10
}

fn default_match_threshold() -> f32 {
    0.5
}

fn default_rrf_k() -> usize {
    60
}

fn default_rerank_prefix_size() -> usize {
    50
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            match_threshold: default_match_threshold(),
            rrf_k: default_rrf_k(),
            use_rerank: false,
            rerank_prefix_size: default_rerank_prefix_size(),
            allow_degraded: false,
        }
    }
}

impl SearchOptions {
    /// Validate all option fields.
    ///
    /// Collects all validation errors and reports them together so the
    /// caller can fix everything in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.limit == 0 {
            errors.push("limit must be positive".to_string());
        }
        if self.rrf_k == 0 {
            errors.push("rrf_k must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            errors.push(format!(
                "match_threshold must be within [0, 1], got {}",
                self.match_threshold
            ));
        }
        if self.use_rerank && self.rerank_prefix_size == 0 {
            errors.push("rerank_prefix_size must be positive when use_rerank is set".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("{}", errors.join("; "))
        }
    }
}

/// Per-collaborator timeouts in seconds.
///
/// A timed-out call is treated identically to a failed call by the
/// surrounding failure policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_secs: u64,
    #[serde(default = "default_store_timeout_secs")]
    pub vector_store_secs: u64,
    #[serde(default = "default_store_timeout_secs")]
    pub keyword_store_secs: u64,
    #[serde(default = "default_rerank_timeout_secs")]
    pub rerank_secs: u64,
    #[serde(default = "default_cache_timeout_secs")]
    pub cache_secs: u64,
}

fn default_embedding_timeout_secs() -> u64 {
    10
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_rerank_timeout_secs() -> u64 {
    30
}

fn default_cache_timeout_secs() -> u64 {
    2
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_secs: default_embedding_timeout_secs(),
            vector_store_secs: default_store_timeout_secs(),
            keyword_store_secs: default_store_timeout_secs(),
            rerank_secs: default_rerank_timeout_secs(),
            cache_secs: default_cache_timeout_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_secs)
    }

    pub fn vector_store(&self) -> Duration {
        Duration::from_secs(self.vector_store_secs)
    }

    pub fn keyword_store(&self) -> Duration {
        Duration::from_secs(self.keyword_store_secs)
    }

    pub fn rerank(&self) -> Duration {
        Duration::from_secs(self.rerank_secs)
    }

    pub fn cache(&self) -> Duration {
        Duration::from_secs(self.cache_secs)
    }
}

/// Engine-level configuration, fixed at construction time
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Retrieval depth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many records each retriever fetches before fusion
    #[serde(default = "default_candidate_count")]
    pub candidate_count: usize,
}

fn default_candidate_count() -> usize {
    20
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_count: default_candidate_count(),
        }
    }
}

/// Embedding cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for cached query embeddings, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.retrieval.candidate_count == 0 {
            errors.push("candidate_count must be positive".to_string());
        }
        if self.timeouts.embedding_secs == 0 {
            errors.push("embedding timeout must be positive".to_string());
        }
        if self.timeouts.vector_store_secs == 0 {
            errors.push("vector store timeout must be positive".to_string());
        }
        if self.timeouts.keyword_store_secs == 0 {
            errors.push("keyword store timeout must be positive".to_string());
        }
        if self.timeouts.rerank_secs == 0 {
            errors.push("rerank timeout must be positive".to_string());
        }
        if self.timeouts.cache_secs == 0 {
            errors.push("cache timeout must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("invalid engine config: {}", errors.join("; "))
        }
    }
}
