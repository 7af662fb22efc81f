//! Rank fusion
//!
//! Implements Reciprocal Rank Fusion (RRF) for merging the vector and
//! keyword retrieval lists into one deterministic order.

use crate::types::{RankedRecord, RecordId, SearchRecord};
use std::cmp::Ordering;
use std::collections::HashMap;

/// RRF contribution of one list position: `1 / (k + rank)`, 0 if absent
fn rrf_contribution(rank: Option<usize>, rrf_k: usize) -> f32 {
    match rank {
        Some(rank) => 1.0 / (rrf_k + rank) as f32,
        None => 0.0,
    }
}

/// Ranks compare ascending; a present rank sorts before an absent one
fn cmp_rank(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Merge two retrieval lists with Reciprocal Rank Fusion.
///
/// Each record's `fusion_score` is the sum of `1 / (rrf_k + rank)` over the
/// lists it appears in (ranks are 1-based list positions). Records present
/// in both lists are merged into one entry, keeping the vector instance's
/// fields (it carries `similarity`). The result is the full union sorted
/// descending by score with a deterministic tiebreak: vector presence
/// first, then vector rank, then keyword rank, then id. No truncation
/// happens here.
pub fn fuse(
    vector_list: Vec<SearchRecord>,
    keyword_list: Vec<SearchRecord>,
    rrf_k: usize,
) -> Vec<RankedRecord> {
    let mut merged: HashMap<RecordId, RankedRecord> = HashMap::new();

    for (index, record) in vector_list.into_iter().enumerate() {
        merged.insert(
            record.id.clone(),
            RankedRecord {
                record,
                vector_rank: Some(index + 1),
                keyword_rank: None,
                fusion_score: 0.0,
                rerank_score: None,
            },
        );
    }

    for (index, record) in keyword_list.into_iter().enumerate() {
        match merged.get_mut(&record.id) {
            // Already found by vector retrieval: keep the richer instance,
            // only record the keyword rank
            Some(existing) => existing.keyword_rank = Some(index + 1),
            None => {
                merged.insert(
                    record.id.clone(),
                    RankedRecord {
                        record,
                        vector_rank: None,
                        keyword_rank: Some(index + 1),
                        fusion_score: 0.0,
                        rerank_score: None,
                    },
                );
            }
        }
    }

    let mut results: Vec<RankedRecord> = merged
        .into_values()
        .map(|mut ranked| {
            ranked.fusion_score = rrf_contribution(ranked.vector_rank, rrf_k)
                + rrf_contribution(ranked.keyword_rank, rrf_k);
            ranked
        })
        .collect();

    // Strict total order: the HashMap's iteration order must never leak
    // into the result
    results.sort_by(|a, b| {
        b.fusion_score
            .total_cmp(&a.fusion_score)
            .then_with(|| b.from_vector().cmp(&a.from_vector()))
            .then_with(|| cmp_rank(a.vector_rank, b.vector_rank))
            .then_with(|| cmp_rank(a.keyword_rank, b.keyword_rank))
            .then_with(|| a.record.id.cmp(&b.record.id))
    });

    results
}
