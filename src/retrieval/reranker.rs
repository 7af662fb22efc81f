//! LLM reranking pass
//!
//! Re-orders a prefix of the fused list by LLM relevance judgment. The
//! pass is a quality enhancement, never a correctness dependency: any
//! failure returns the input unchanged.

use crate::providers::RerankProvider;
use crate::types::{RankedRecord, RerankCandidate};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Reranks the top of a fused result list via a single batched provider
/// call.
pub struct Reranker {
    provider: Arc<dyn RerankProvider>,
    timeout: Duration,
}

impl Reranker {
    pub fn new(provider: Arc<dyn RerankProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Rerank the first `prefix_size` candidates; the rest of the list is
    /// appended untouched in its fused order.
    ///
    /// Ids the provider fails to score get `rerank_score = 0` and sort to
    /// the bottom of the prefix rather than being dropped. On any provider
    /// error, timeout, or malformed payload the input is returned exactly
    /// as received, with no scores populated. This silent fallback is the
    /// documented contract, not an accident; rerank failures must never
    /// abort a search.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RankedRecord>,
        prefix_size: usize,
    ) -> Vec<RankedRecord> {
        if candidates.is_empty() || prefix_size == 0 {
            return candidates;
        }

        let split = prefix_size.min(candidates.len());
        let batch: Vec<RerankCandidate> = candidates[..split].iter().map(Into::into).collect();

        debug!("Reranking {} of {} candidates", split, candidates.len());

        let scores = match timeout(self.timeout, self.provider.score(query, &batch)).await {
            Ok(Ok(scores)) => scores,
            Ok(Err(e)) => {
                warn!("Rerank failed, keeping fused order: {}", e);
                return candidates;
            }
            Err(_) => {
                warn!("Rerank timed out after {:?}, keeping fused order", self.timeout);
                return candidates;
            }
        };

        let mut prefix = candidates;
        let suffix = prefix.split_off(split);

        for ranked in prefix.iter_mut() {
            ranked.rerank_score = Some(scores.get(&ranked.record.id).copied().unwrap_or(0.0));
        }

        // Stable sort: equal scores keep their fused order
        prefix.sort_by(|a, b| {
            b.rerank_score
                .unwrap_or(0.0)
                .total_cmp(&a.rerank_score.unwrap_or(0.0))
        });

        prefix.extend(suffix);
        prefix
    }
}
