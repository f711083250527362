use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::{KeywordHit, SearchFilters, SearchResult};

/// Port for the semantic document index collaborator.
///
/// Implementations own their timeouts and scoring; the retrieval engine
/// never retries a failed call.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Run a semantic similarity query.
    ///
    /// # Arguments
    /// * `query` - Natural-language query text
    /// * `limit` - Maximum number of results
    /// * `score_threshold` - Drop hits scoring below this, if set
    /// * `filters` - Metadata filters to apply at the index, if supported
    ///
    /// Returns results ordered most-relevant first.
    async fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: Option<f32>,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<SearchResult>>;
}

/// Port for the keyword retriever collaborator.
///
/// Returns ranked (but unscored) hits; the retrieval engine assigns
/// reciprocal-rank scores before fusing with semantic results.
#[async_trait]
pub trait KeywordIndex: Send + Sync {
    /// Fetch hits ranked by keyword relevance, best first.
    async fn relevant(&self, query: &str) -> Result<Vec<KeywordHit>>;
}
