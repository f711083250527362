//! Retrieval result and filter types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How many content characters a fingerprint keeps when a result has no
/// document id.
const FINGERPRINT_CONTENT_CHARS: usize = 50;

/// A ranked chunk returned by the retrieval subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Source document id. May be empty for anonymous chunks.
    pub document_id: String,

    /// Chunk text.
    pub content: String,

    /// Similarity score from the semantic index (0-1, higher is better).
    pub semantic_score: f32,

    /// Score from the keyword retriever (0-1, higher is better).
    pub keyword_score: f32,

    /// Weighted combination of the two, set by score fusion.
    pub combined_score: f32,

    /// Document metadata: document type, company, compliance tags.
    pub metadata: serde_json::Value,
}

impl SearchResult {
    /// Create a semantically-scored result. The combined score starts at
    /// the semantic score so single-channel paths stay ranked.
    pub fn semantic(
        document_id: String,
        content: String,
        score: f32,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            document_id,
            content,
            semantic_score: score,
            keyword_score: 0.0,
            combined_score: score,
            metadata,
        }
    }

    /// Create a keyword-scored result.
    pub fn keyword(
        document_id: String,
        content: String,
        score: f32,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            document_id,
            content,
            semantic_score: 0.0,
            keyword_score: score,
            combined_score: score,
            metadata,
        }
    }

    /// Deduplication key: the document id when present, otherwise a
    /// truncated-content prefix.
    pub fn fingerprint(&self) -> String {
        if self.document_id.is_empty() {
            self.content.chars().take(FINGERPRINT_CONTENT_CHARS).collect()
        } else {
            self.document_id.clone()
        }
    }

    /// Returns true if this is a high-quality match (combined score > 0.7).
    pub fn is_high_quality(&self) -> bool {
        self.combined_score > 0.7
    }
}

/// Metadata filters applied to retrieval results.
///
/// Keys are metadata field names; sorted ordering (`BTreeMap`) keeps the
/// serialized form canonical for cache keys. A list value matches when the
/// metadata value is a member; a scalar value matches on equality.
pub type SearchFilters = BTreeMap<String, serde_json::Value>;

/// Whether a result's metadata satisfies every filter entry.
///
/// A result matches iff every filter key is present in its metadata and
/// the value matches per the list/scalar rule above.
pub fn matches_filters(metadata: &serde_json::Value, filters: &SearchFilters) -> bool {
    filters.iter().all(|(key, wanted)| {
        let Some(actual) = metadata.get(key) else {
            return false;
        };
        match wanted {
            serde_json::Value::Array(allowed) => match actual {
                // Tag-list metadata matches when any tag is allowed.
                serde_json::Value::Array(tags) => {
                    tags.iter().any(|tag| allowed.contains(tag))
                }
                scalar => allowed.contains(scalar),
            },
            scalar => actual == scalar,
        }
    })
}

/// A hit from the keyword retriever collaborator: ranked, unscored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordHit {
    pub content: String,
    pub metadata: serde_json::Value,
    /// Source document id when the retriever knows it.
    #[serde(default)]
    pub document_id: Option<String>,
}
