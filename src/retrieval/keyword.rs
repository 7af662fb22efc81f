//! Literal keyword retrieval

use super::{RetrievalStage, SearchError};
use crate::config::TimeoutConfig;
use crate::providers::KeywordStore;
use crate::types::SearchRecord;
use anyhow::anyhow;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::debug;

/// Retrieves records by literal match against the store's text fields.
///
/// The store decides which fields are searched (title, organization,
/// description in the reference deployment) and the ordering of equally
/// matching records (e.g. soonest deadline first); both are store policy,
/// not engine logic. Rank is purely positional; no score is produced.
pub struct KeywordRetriever {
    store: Arc<dyn KeywordStore>,
    timeouts: TimeoutConfig,
}

impl KeywordRetriever {
    pub fn new(store: Arc<dyn KeywordStore>, timeouts: TimeoutConfig) -> Self {
        Self { store, timeouts }
    }

    /// Retrieve up to `top_n` matching records in the store's native order
    /// (rank = position + 1). Failures and timeouts surface as typed
    /// errors; there is no internal fallback.
    pub async fn retrieve(
        &self,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<SearchRecord>, SearchError> {
        let records = timeout(
            self.timeouts.keyword_store(),
            self.store.matching(query, top_n),
        )
        .await
        .map_err(|_| {
            SearchError::retrieval(
                RetrievalStage::KeywordStore,
                anyhow!("timed out after {:?}", self.timeouts.keyword_store()),
            )
        })?
        .map_err(|e| SearchError::retrieval(RetrievalStage::KeywordStore, e))?;

        debug!("Keyword search: {} results", records.len());
        Ok(records)
    }
}
