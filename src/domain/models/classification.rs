//! Document classification types.
//!
//! Free text from a classifier model is turned into a
//! [`DocumentClassification`] through two explicit paths:
//! [`DocumentClassification::parse`] is the strict one, and
//! [`DocumentClassification::fallback`] is the documented keyword
//! default, so callers can always distinguish "parsed" from "defaulted".

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Risk level assigned by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Classification of one retrieved chunk or document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentClassification {
    /// Audit document category, e.g. "access_review".
    pub document_type: String,

    /// Compliance frameworks the document relates to.
    pub frameworks: Vec<String>,

    pub risk_level: RiskLevel,

    /// Classifier confidence (0-1).
    pub confidence: f32,

    /// Source document, when known.
    #[serde(default)]
    pub document_id: Option<String>,
}

/// Document-type phrases recognized by the fallback heuristic, paired
/// with the type they map to.
const TYPE_PHRASES: [(&str, &str); 3] = [
    ("access review", "access_review"),
    ("reconciliation", "financial_reconciliation"),
    ("risk assessment", "risk_assessment"),
];

/// Framework names recognized by the fallback heuristic.
const KNOWN_FRAMEWORKS: [&str; 6] = ["sox", "gdpr", "hipaa", "pci", "iso 27001", "soc 2"];

/// Confidence reported for keyword-defaulted classifications.
const FALLBACK_CONFIDENCE: f32 = 0.25;

impl DocumentClassification {
    /// Strict parse of a classifier response.
    ///
    /// Accepts a bare JSON object or one wrapped in a fenced code block.
    pub fn parse(text: &str) -> DomainResult<Self> {
        let trimmed = text.trim();
        let body = trimmed
            .strip_prefix("```")
            .map(|rest| rest.strip_prefix("json").unwrap_or(rest).trim_end_matches('`'))
            .unwrap_or(trimmed)
            .trim();
        serde_json::from_str(body)
            .map_err(|e| DomainError::ClassificationFailed(format!("unparseable response: {e}")))
    }

    /// Deterministic keyword default used when the strict parse fails.
    ///
    /// Scans the content for known document-type phrases and framework
    /// names; risk stays at the default and the low confidence marks the
    /// result as defaulted.
    pub fn fallback(content: &str) -> Self {
        let lowered = content.to_lowercase();

        let document_type = TYPE_PHRASES
            .iter()
            .find(|(phrase, _)| lowered.contains(phrase))
            .map_or("unknown", |(_, kind)| *kind)
            .to_string();

        let frameworks = KNOWN_FRAMEWORKS
            .iter()
            .filter(|f| lowered.contains(*f))
            .map(|f| f.to_uppercase())
            .collect();

        Self {
            document_type,
            frameworks,
            risk_level: RiskLevel::default(),
            confidence: FALLBACK_CONFIDENCE,
            document_id: None,
        }
    }

    /// Attach the source document id.
    pub fn for_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }
}
