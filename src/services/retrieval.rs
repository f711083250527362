//! Adaptive retrieval engine.
//!
//! Executes the selected retrieval technique against the document index
//! collaborators, using the retrieval cache and score fusion. Nothing in
//! this module retries; failures surface to the stage envelope.

use std::sync::Arc;

use anyhow::Result;

use crate::domain::models::{
    matches_filters, KeywordHit, RetrievalConfig, SearchFilters, SearchResult,
};
use crate::domain::ports::{DocumentIndex, KeywordIndex};
use crate::services::cache::RetrievalCache;
use crate::services::fusion;
use crate::services::strategy::RetrievalStrategy;

/// Fewest filtered results tolerated before recall wins over precision.
const MIN_FILTERED_RESULTS: usize = 3;

/// How many unfiltered results the fallback returns.
const FILTER_FALLBACK_LIMIT: usize = 5;

/// Most query variants issued by query expansion, original included.
const MAX_EXPANSION_VARIANTS: usize = 5;

/// Most seed terms carried from one hop into the next query.
const MAX_HOP_TERMS: usize = 3;

/// Minimum length of a term extracted from hop results.
const MIN_HOP_TERM_LEN: usize = 6;

/// Domain vocabulary for query expansion, keyed by query substring.
const EXPANSION_VOCABULARY: [(&str, &[&str]); 5] = [
    (
        "access",
        &[
            "user access control",
            "privileged accounts",
            "provisioning and deprovisioning",
            "authentication policy",
        ],
    ),
    (
        "financial",
        &[
            "financial reconciliation",
            "journal entries",
            "general ledger review",
        ],
    ),
    (
        "risk",
        &["risk assessment", "control deficiencies", "mitigation plan"],
    ),
    (
        "sox",
        &["internal controls", "SOX 404 testing", "material weakness"],
    ),
    (
        "control",
        &["control testing", "control owner", "compensating controls"],
    ),
];

/// Common words never used as hop seed terms.
const HOP_STOPWORDS: [&str; 12] = [
    "should", "would", "could", "against", "because", "before", "between", "during", "through",
    "without", "within", "company",
];

/// Executes retrieval strategies against the document index.
///
/// Holds process-wide handles to the cache and the index collaborators;
/// the keyword index is optional and its absence degrades the ensemble
/// and hybrid paths to semantic-only behavior.
pub struct RetrievalEngine {
    index: Arc<dyn DocumentIndex>,
    keyword_index: Option<Arc<dyn KeywordIndex>>,
    cache: Arc<RetrievalCache>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        index: Arc<dyn DocumentIndex>,
        keyword_index: Option<Arc<dyn KeywordIndex>>,
        cache: Arc<RetrievalCache>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            keyword_index,
            cache,
            config,
        }
    }

    /// Dispatch to the selected strategy. The match is exhaustive; there
    /// is no unhandled-strategy path.
    pub async fn retrieve(
        &self,
        strategy: RetrievalStrategy,
        query: &str,
        limit: usize,
        filters: Option<&SearchFilters>,
        extra_terms: &[String],
    ) -> Result<Vec<SearchResult>> {
        tracing::debug!(%strategy, query, limit, "executing retrieval");
        match strategy {
            RetrievalStrategy::Semantic => self.semantic(query, limit, filters).await,
            RetrievalStrategy::Hybrid => {
                self.hybrid(
                    query,
                    limit,
                    filters,
                    self.config.semantic_weight,
                    self.config.keyword_weight,
                )
                .await
            }
            RetrievalStrategy::QueryExpansion => {
                self.query_expansion(query, limit, extra_terms).await
            }
            RetrievalStrategy::MultiHop => {
                self.multi_hop(query, limit, self.config.max_hops).await
            }
            RetrievalStrategy::Ensemble => self.ensemble(query, limit).await,
        }
    }

    /// Plain semantic search against the index.
    pub async fn semantic(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<SearchResult>> {
        self.index
            .semantic_search(query, limit, self.config.score_threshold, filters)
            .await
    }

    /// Cached fused semantic + keyword retrieval.
    ///
    /// Checks the cache on the normalized (query, limit, filters) key; on
    /// a miss, issues one independent semantic query and one independent
    /// keyword query, fuses the scores, applies metadata filters with the
    /// recall fallback, truncates, and stores the result under the same
    /// key.
    pub async fn hybrid(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&SearchFilters>,
        w_semantic: f32,
        w_keyword: f32,
    ) -> Result<Vec<SearchResult>> {
        if let Some(cached) = self.cache.get(query, limit, filters) {
            tracing::debug!(query, "hybrid retrieval served from cache");
            return Ok(cached);
        }

        let semantic = self
            .index
            .semantic_search(query, limit, self.config.score_threshold, None)
            .await?;
        let keyword = self.keyword_results(query).await?;

        let fused = fusion::fuse(semantic, keyword, w_semantic, w_keyword);
        let mut results = apply_filters(fused, filters);
        results.truncate(limit);

        self.cache.set(query, limit, filters, results.clone(), None);
        Ok(results)
    }

    /// One retrieval per domain-vocabulary query variant.
    ///
    /// Builds up to [`MAX_EXPANSION_VARIANTS`] variants by appending
    /// vocabulary terms for every category whose key appears in the
    /// query, plus any caller-supplied extra terms. Each variant gets an
    /// equal share of the limit; results are deduplicated by fingerprint
    /// and re-sorted by score.
    pub async fn query_expansion(
        &self,
        query: &str,
        limit: usize,
        extra_terms: &[String],
    ) -> Result<Vec<SearchResult>> {
        let variants = expansion_variants(query, extra_terms);
        let per_variant = (limit / variants.len()).max(1);
        tracing::debug!(
            query,
            variants = variants.len(),
            per_variant,
            "expanding query"
        );

        let mut collected = Vec::new();
        for variant in &variants {
            let hits = self
                .index
                .semantic_search(variant, per_variant, self.config.score_threshold, None)
                .await?;
            collected.extend(hits);
        }

        let mut deduped = dedup_by_fingerprint(collected);
        sort_by_combined_score(&mut deduped);
        deduped.truncate(limit);
        Ok(deduped)
    }

    /// Iterative multi-hop retrieval.
    ///
    /// Hop i+1's query is the original query plus seed terms extracted
    /// from hop i's top results, so a hop never starts before the
    /// previous one fully completes. Results accumulate across hops and
    /// are deduplicated, sorted, and truncated at the end.
    pub async fn multi_hop(
        &self,
        query: &str,
        limit: usize,
        max_hops: usize,
    ) -> Result<Vec<SearchResult>> {
        let mut collected: Vec<SearchResult> = Vec::new();
        let mut hop_query = query.to_string();

        for hop in 0..max_hops.max(1) {
            let hits = self
                .index
                .semantic_search(&hop_query, limit, self.config.score_threshold, None)
                .await?;
            tracing::debug!(hop, query = %hop_query, hits = hits.len(), "multi-hop round");
            if hits.is_empty() {
                break;
            }

            let seeds = hop_seed_terms(&hits, query);
            collected.extend(hits);
            if seeds.is_empty() {
                break;
            }
            hop_query = format!("{} {}", query, seeds.join(" "));
        }

        let mut deduped = dedup_by_fingerprint(collected);
        sort_by_combined_score(&mut deduped);
        deduped.truncate(limit);
        Ok(deduped)
    }

    /// Pre-combined keyword+semantic retrieval.
    ///
    /// Degrades to plain semantic search when the keyword retriever is
    /// unavailable.
    pub async fn ensemble(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if self.keyword_index.is_none() {
            tracing::debug!(query, "keyword retriever unavailable, ensemble degrades to semantic");
            return self.semantic(query, limit, None).await;
        }

        let semantic = self
            .index
            .semantic_search(query, limit, self.config.score_threshold, None)
            .await?;
        let keyword = self.keyword_results(query).await?;
        let mut fused = fusion::fuse(
            semantic,
            keyword,
            self.config.semantic_weight,
            self.config.keyword_weight,
        );
        fused.truncate(limit);
        Ok(fused)
    }

    /// Keyword hits scored by reciprocal rank, or empty when the keyword
    /// retriever is not configured.
    async fn keyword_results(&self, query: &str) -> Result<Vec<SearchResult>> {
        let Some(keyword_index) = &self.keyword_index else {
            return Ok(Vec::new());
        };
        let hits = keyword_index.relevant(query).await?;
        Ok(score_keyword_hits(hits))
    }
}

/// Assign reciprocal-rank scores to ranked keyword hits.
fn score_keyword_hits(hits: Vec<KeywordHit>) -> Vec<SearchResult> {
    hits.into_iter()
        .enumerate()
        .map(|(rank, hit)| {
            SearchResult::keyword(
                hit.document_id.unwrap_or_default(),
                hit.content,
                1.0 / (1.0 + rank as f32),
                hit.metadata,
            )
        })
        .collect()
}

/// Apply metadata filters with the recall-over-precision safety valve:
/// when filtering drops the count below [`MIN_FILTERED_RESULTS`] while
/// the unfiltered set had at least that many, serve the unfiltered top
/// [`FILTER_FALLBACK_LIMIT`] instead.
fn apply_filters(results: Vec<SearchResult>, filters: Option<&SearchFilters>) -> Vec<SearchResult> {
    let Some(filters) = filters.filter(|f| !f.is_empty()) else {
        return results;
    };

    let filtered: Vec<SearchResult> = results
        .iter()
        .filter(|r| matches_filters(&r.metadata, filters))
        .cloned()
        .collect();

    if filtered.len() < MIN_FILTERED_RESULTS && results.len() >= MIN_FILTERED_RESULTS {
        tracing::debug!(
            filtered = filtered.len(),
            unfiltered = results.len(),
            "filters too strict, falling back to unfiltered results"
        );
        let mut fallback = results;
        fallback.truncate(FILTER_FALLBACK_LIMIT);
        return fallback;
    }

    filtered
}

/// Build the expansion variant list: the original query first, then one
/// variant per vocabulary term whose category key appears in the query,
/// then caller-supplied terms, capped at [`MAX_EXPANSION_VARIANTS`].
fn expansion_variants(query: &str, extra_terms: &[String]) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut variants = vec![query.to_string()];

    let vocabulary = EXPANSION_VOCABULARY
        .iter()
        .filter(|(key, _)| lowered.contains(key))
        .flat_map(|(_, terms)| terms.iter().map(|t| (*t).to_string()));

    for term in vocabulary.chain(extra_terms.iter().cloned()) {
        if variants.len() >= MAX_EXPANSION_VARIANTS {
            break;
        }
        if term.is_empty() || lowered.contains(&term.to_lowercase()) {
            continue;
        }
        variants.push(format!("{query} {term}"));
    }

    variants
}

/// Extract up to [`MAX_HOP_TERMS`] long alphabetic terms from the top
/// results of a hop, skipping stopwords and words already in the query.
fn hop_seed_terms(hits: &[SearchResult], original_query: &str) -> Vec<String> {
    let query_lowered = original_query.to_lowercase();
    let mut seeds: Vec<String> = Vec::new();

    for hit in hits.iter().take(3) {
        for word in hit.content.split_whitespace() {
            let term: String = word
                .chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase();
            if term.len() < MIN_HOP_TERM_LEN
                || HOP_STOPWORDS.contains(&term.as_str())
                || query_lowered.contains(&term)
                || seeds.contains(&term)
            {
                continue;
            }
            seeds.push(term);
            if seeds.len() >= MAX_HOP_TERMS {
                return seeds;
            }
        }
    }

    seeds
}

/// Keep the best-scored result per fingerprint, preserving first-seen
/// order.
fn dedup_by_fingerprint(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut deduped: Vec<SearchResult> = Vec::with_capacity(results.len());
    let mut index_by_fingerprint = std::collections::HashMap::new();

    for result in results {
        let fingerprint = result.fingerprint();
        match index_by_fingerprint.get(&fingerprint) {
            Some(&i) => {
                let kept: &mut SearchResult = &mut deduped[i];
                if result.combined_score > kept.combined_score {
                    *kept = result;
                }
            }
            None => {
                index_by_fingerprint.insert(fingerprint, deduped.len());
                deduped.push(result);
            }
        }
    }

    deduped
}

fn sort_by_combined_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
