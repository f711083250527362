//! Question-trait-driven retrieval strategy selection.
//!
//! A first-match rule table maps question traits to a retrieval
//! technique. Cheap, narrowly-scoped techniques serve well-formed
//! queries; multi-hop costs at least twice the index calls of any other
//! path, so it is reserved for explicitly comparative advanced questions.

use serde::{Deserialize, Serialize};

use crate::domain::models::{Complexity, QuestionAnalysis};

/// The closed set of retrieval techniques.
///
/// Dispatch on this enum is exhaustive; there is no unhandled-strategy
/// case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Sequential retrieval rounds, each seeded by the previous round's
    /// results.
    MultiHop,
    /// One retrieval per domain-vocabulary query variant.
    QueryExpansion,
    /// Fused semantic + keyword retrieval with caching.
    Hybrid,
    /// Pre-combined keyword+semantic retriever.
    Ensemble,
    /// Plain semantic search.
    Semantic,
}

impl RetrievalStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            RetrievalStrategy::MultiHop => "multi_hop",
            RetrievalStrategy::QueryExpansion => "query_expansion",
            RetrievalStrategy::Hybrid => "hybrid",
            RetrievalStrategy::Ensemble => "ensemble",
            RetrievalStrategy::Semantic => "semantic",
        }
    }
}

impl std::fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a strategy selection decision.
#[derive(Debug, Clone)]
pub struct StrategySelection {
    pub strategy: RetrievalStrategy,
    /// Which rule fired, for logs and reports.
    pub reason: String,
}

/// Comparative wording that routes advanced questions to multi-hop.
const COMPARATIVE_TERMS: [&str; 4] = ["compare", "relationship", "connection", "across"];

/// Compliance vocabulary that routes to query expansion.
const COMPLIANCE_KEYWORDS: [&str; 8] = [
    "sox",
    "gdpr",
    "hipaa",
    "pci",
    "iso 27001",
    "soc 2",
    "material weakness",
    "controls",
];

/// Known document-type phrases that route to hybrid retrieval.
const DOCUMENT_TYPE_PHRASES: [&str; 3] =
    ["access review", "financial reconciliation", "risk assessment"];

/// Rule-table selector mapping question traits to a retrieval technique.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategySelector;

impl StrategySelector {
    pub fn new() -> Self {
        Self
    }

    /// Select a strategy for a question. Rules are evaluated in order and
    /// the first match wins.
    pub fn select(
        &self,
        question: &str,
        complexity: Complexity,
        analysis: &QuestionAnalysis,
    ) -> StrategySelection {
        let lowered = question.to_lowercase();

        if complexity == Complexity::Advanced
            && COMPARATIVE_TERMS.iter().any(|t| lowered.contains(t))
        {
            return StrategySelection {
                strategy: RetrievalStrategy::MultiHop,
                reason: "advanced comparative question".to_string(),
            };
        }

        if COMPLIANCE_KEYWORDS.iter().any(|k| lowered.contains(k))
            || !analysis.frameworks.is_empty()
        {
            return StrategySelection {
                strategy: RetrievalStrategy::QueryExpansion,
                reason: "compliance keyword present".to_string(),
            };
        }

        if DOCUMENT_TYPE_PHRASES.iter().any(|p| lowered.contains(p))
            || !analysis.document_types.is_empty()
        {
            return StrategySelection {
                strategy: RetrievalStrategy::Hybrid,
                reason: "known document-type phrase".to_string(),
            };
        }

        if complexity == Complexity::Intermediate {
            return StrategySelection {
                strategy: RetrievalStrategy::Ensemble,
                reason: "intermediate complexity".to_string(),
            };
        }

        StrategySelection {
            strategy: RetrievalStrategy::Semantic,
            reason: "default".to_string(),
        }
    }
}
