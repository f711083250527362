//! Pipeline stage types.
//!
//! A run moves through the stages in [`StageKind::ORDERED`] order,
//! unconditionally. Each stage produces a [`StageResult`] that is merged
//! into the run state by stage kind; a failed stage never halts the run.

use serde::{Deserialize, Serialize};

/// One atomic pipeline unit, wrapping a single collaborator call.
///
/// The set is closed: adding a stage means extending this enum and the
/// engine's dispatch, which the compiler enforces exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Stamp run metadata and load conversation history.
    Initialize,
    /// Derive complexity, topics, and frameworks from the question.
    AnalyzeQuestion,
    /// Select a retrieval strategy and fetch supporting chunks.
    RetrieveContext,
    /// Classify the retrieved document(s).
    ClassifyDocuments,
    /// Produce the compliance analysis over the retrieved context.
    AnalyzeCompliance,
    /// Fetch regulatory guidance for the detected frameworks.
    RegulatorySearch,
    /// Compose the final answer from all filled slots.
    SynthesizeResponse,
}

impl StageKind {
    /// Strict pipeline order. The engine iterates this slice and nothing
    /// ever reorders or skips an entry.
    pub const ORDERED: [StageKind; 7] = [
        StageKind::Initialize,
        StageKind::AnalyzeQuestion,
        StageKind::RetrieveContext,
        StageKind::ClassifyDocuments,
        StageKind::AnalyzeCompliance,
        StageKind::RegulatorySearch,
        StageKind::SynthesizeResponse,
    ];

    /// Stable snake_case name, used as the slot key in reports.
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Initialize => "initialize",
            StageKind::AnalyzeQuestion => "analyze_question",
            StageKind::RetrieveContext => "retrieve_context",
            StageKind::ClassifyDocuments => "classify_documents",
            StageKind::AnalyzeCompliance => "analyze_compliance",
            StageKind::RegulatorySearch => "regulatory_search",
            StageKind::SynthesizeResponse => "synthesize_response",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome status of a single stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
}

/// Token usage counters reported by a completion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens consumed.
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Accumulate another usage record into this one.
    pub fn accumulate(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// Result envelope produced by running one stage.
///
/// Merged into the run state by stage kind: a later record for the same
/// stage overwrites the envelope but the typed slot a stage filled is
/// left as-is, so a failure leaves partial output in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageKind,
    pub status: StageStatus,
    /// Small JSON digest of what the stage produced (counts, labels).
    pub summary: serde_json::Value,
    pub duration_ms: u64,
    pub token_usage: Option<TokenUsage>,
    pub error: Option<String>,
}

impl StageResult {
    /// Build a completed result.
    pub fn completed(stage: StageKind, summary: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            summary,
            duration_ms,
            token_usage: None,
            error: None,
        }
    }

    /// Build a failed result preserving the collaborator's message.
    pub fn failed(stage: StageKind, error: String, duration_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            summary: serde_json::Value::Null,
            duration_ms,
            token_usage: None,
            error: Some(error),
        }
    }

    /// Attach token usage counters.
    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.token_usage = usage;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == StageStatus::Completed
    }
}
