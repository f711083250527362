//! In-memory document index.
//!
//! Backs the CLI and tests with a process-lifetime index over a small
//! corpus. Semantic scoring is term-frequency cosine similarity, a
//! lightweight stand-in for an embedding-backed index; keyword ranking
//! is raw term overlap. Nothing is persisted.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::models::{matches_filters, KeywordHit, SearchFilters, SearchResult};
use crate::domain::ports::{DocumentIndex, KeywordIndex};

/// One document loaded into the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub content: String,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::json!({})
}

struct IndexEntry {
    document: IndexedDocument,
    term_frequencies: HashMap<String, f32>,
}

/// Term-frequency index over an in-memory corpus.
pub struct InMemoryIndex {
    entries: Vec<IndexEntry>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build an index from a document list.
    pub fn from_documents(documents: Vec<IndexedDocument>) -> Self {
        let mut index = Self::new();
        for document in documents {
            index.add_document(document);
        }
        index
    }

    /// Load a YAML corpus file: a list of `{id, content, metadata}` docs.
    pub fn load_corpus(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).context(format!(
            "Failed to read corpus file {}",
            path.as_ref().display()
        ))?;
        let documents: Vec<IndexedDocument> =
            serde_yaml::from_str(&raw).context("Failed to parse corpus YAML")?;
        tracing::info!(documents = documents.len(), "loaded corpus");
        Ok(Self::from_documents(documents))
    }

    /// Add a document, mirroring its id into metadata so id filters work.
    pub fn add_document(&mut self, mut document: IndexedDocument) {
        if let Some(object) = document.metadata.as_object_mut() {
            object
                .entry("document_id".to_string())
                .or_insert_with(|| serde_json::json!(document.id));
        }
        let term_frequencies = term_frequencies(&document.content);
        self.entries.push(IndexEntry {
            document,
            term_frequencies,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentIndex for InMemoryIndex {
    async fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: Option<f32>,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<SearchResult>> {
        let query_frequencies = term_frequencies(query);
        let threshold = score_threshold.unwrap_or(0.0);

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .filter(|e| filters.is_none_or(|f| matches_filters(&e.document.metadata, f)))
            .filter_map(|e| {
                let score = cosine_similarity(&query_frequencies, &e.term_frequencies);
                if score > threshold {
                    Some(SearchResult::semantic(
                        e.document.id.clone(),
                        e.document.content.clone(),
                        score,
                        e.document.metadata.clone(),
                    ))
                } else {
                    None
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.semantic_score
                .partial_cmp(&a.semantic_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }
}

#[async_trait]
impl KeywordIndex for InMemoryIndex {
    async fn relevant(&self, query: &str) -> Result<Vec<KeywordHit>> {
        let query_terms: Vec<String> = tokenize(query).collect();

        let mut scored: Vec<(usize, &IndexEntry)> = self
            .entries
            .iter()
            .map(|e| {
                let overlap = query_terms
                    .iter()
                    .filter(|t| e.term_frequencies.contains_key(*t))
                    .count();
                (overlap, e)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .map(|(_, e)| KeywordHit {
                content: e.document.content.clone(),
                metadata: e.document.metadata.clone(),
                document_id: Some(e.document.id.clone()),
            })
            .collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_lowercase)
}

fn term_frequencies(text: &str) -> HashMap<String, f32> {
    let mut frequencies = HashMap::new();
    for term in tokenize(text) {
        *frequencies.entry(term).or_insert(0.0) += 1.0;
    }
    frequencies
}

fn cosine_similarity(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f32 = a
        .iter()
        .filter_map(|(term, weight)| b.get(term).map(|other| weight * other))
        .sum();
    if dot == 0.0 {
        return 0.0;
    }
    let norm_a: f32 = a.values().map(|w| w * w).sum::<f32>().sqrt();
    let norm_b: f32 = b.values().map(|w| w * w).sum::<f32>().sqrt();
    dot / (norm_a * norm_b)
}
