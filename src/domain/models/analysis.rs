//! Question analysis types.
//!
//! The analysis stage asks the completion service to describe the question
//! as JSON. Parsing is split into two explicit paths so callers can tell
//! them apart: [`QuestionAnalysis::parse`] is the strict path and
//! [`QuestionAnalysis::fallback`] is the documented keyword-heuristic
//! default used when the strict path fails.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Question complexity, as judged by the analysis stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

/// Structured description of an incoming question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    #[serde(default)]
    pub complexity: Complexity,

    /// Coarse question category, e.g. "factual", "comparative".
    #[serde(default)]
    pub question_type: String,

    /// Topics mentioned in the question.
    #[serde(default)]
    pub topics: Vec<String>,

    /// Compliance frameworks the question touches (SOX, GDPR, ...).
    #[serde(default)]
    pub frameworks: Vec<String>,

    /// Audit document types the question refers to.
    #[serde(default)]
    pub document_types: Vec<String>,
}

/// Framework names recognized by the fallback heuristic.
const KNOWN_FRAMEWORKS: [&str; 6] = ["sox", "gdpr", "hipaa", "pci", "iso 27001", "soc 2"];

/// Document-type phrases recognized by the fallback heuristic.
const KNOWN_DOCUMENT_TYPES: [&str; 3] =
    ["access review", "financial reconciliation", "risk assessment"];

/// Comparative wording that marks a question as advanced.
const COMPARATIVE_TERMS: [&str; 4] = ["compare", "relationship", "connection", "across"];

impl QuestionAnalysis {
    /// Strict parse of a completion response.
    ///
    /// Accepts a bare JSON object or one wrapped in a fenced code block.
    /// Anything else is an error; callers that want a usable value anyway
    /// should fall back via [`QuestionAnalysis::fallback`].
    pub fn parse(text: &str) -> DomainResult<Self> {
        let body = strip_code_fence(text);
        serde_json::from_str(body)
            .map_err(|e| DomainError::AnalysisParseFailed(format!("{e}: {body:.120}")))
    }

    /// Deterministic keyword-heuristic default.
    ///
    /// Scans the question for known frameworks, document-type phrases, and
    /// comparative wording. Complexity: advanced when comparative wording
    /// is present, intermediate when a framework or document type is,
    /// basic otherwise.
    pub fn fallback(question: &str) -> Self {
        let lowered = question.to_lowercase();

        let frameworks: Vec<String> = KNOWN_FRAMEWORKS
            .iter()
            .filter(|f| lowered.contains(*f))
            .map(|f| f.to_uppercase())
            .collect();

        let document_types: Vec<String> = KNOWN_DOCUMENT_TYPES
            .iter()
            .filter(|d| lowered.contains(*d))
            .map(|d| d.replace(' ', "_"))
            .collect();

        let comparative = COMPARATIVE_TERMS.iter().any(|t| lowered.contains(t));

        let complexity = if comparative {
            Complexity::Advanced
        } else if !frameworks.is_empty() || !document_types.is_empty() {
            Complexity::Intermediate
        } else {
            Complexity::Basic
        };

        Self {
            complexity,
            question_type: if comparative {
                "comparative".to_string()
            } else {
                "factual".to_string()
            },
            topics: Vec::new(),
            frameworks,
            document_types,
        }
    }
}

/// Strip a surrounding ``` fence (with optional language tag) if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_end_matches('`').trim()
}
