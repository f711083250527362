//! Run state and report types.
//!
//! A [`RunState`] is exclusively owned by one engine invocation for its
//! whole lifetime; it is never shared across concurrent runs. The error
//! list is append-only within a run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::analysis::QuestionAnalysis;
use crate::domain::models::classification::DocumentClassification;
use crate::domain::models::search::SearchResult;
use crate::domain::models::stage::{StageKind, StageResult, TokenUsage};

/// Overall status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// How the classification stage treats retrieved chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Classify only the top-ranked retrieval result. Latency-optimized
    /// default: one classifier call per run.
    #[default]
    SingleDocument,
    /// Classify every retrieved chunk.
    MultiDocument,
}

/// One prior exchange in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            response: response.into(),
            created_at: Utc::now(),
        }
    }
}

/// Input to a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub question: String,
    pub conversation_id: Option<String>,
    pub document_id: Option<String>,
    pub classification_mode: ClassificationMode,
}

impl RunRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_classification_mode(mut self, mode: ClassificationMode) -> Self {
        self.classification_mode = mode;
        self
    }
}

/// An error accumulated during a run. Appending one never halts the
/// pipeline; it only forces the final status to `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub stage: StageKind,
    pub message: String,
}

/// Mutable state threaded through every stage of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub question: String,
    pub conversation_id: Option<String>,
    pub document_id: Option<String>,
    pub classification_mode: ClassificationMode,

    // Per-stage result slots. A failed stage leaves its slot as the stage
    // left it, possibly partially filled.
    pub question_analysis: Option<QuestionAnalysis>,
    pub retrieved_context: Vec<SearchResult>,
    pub classifications: Vec<DocumentClassification>,
    pub compliance_analysis: Option<String>,
    pub regulatory_context: Option<String>,
    pub final_response: Option<String>,

    /// Prior turns loaded by the initialize stage.
    pub history: Vec<ConversationTurn>,

    /// Name of the retrieval strategy chosen for this run, for reports.
    #[serde(default)]
    pub selected_strategy: Option<String>,

    /// Envelope records, merged by stage kind.
    pub stage_results: Vec<StageResult>,

    /// Append-only within a run.
    pub errors: Vec<RunError>,

    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn new(request: &RunRequest) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            question: request.question.clone(),
            conversation_id: request.conversation_id.clone(),
            document_id: request.document_id.clone(),
            classification_mode: request.classification_mode,
            question_analysis: None,
            retrieved_context: Vec::new(),
            classifications: Vec::new(),
            compliance_analysis: None,
            regulatory_context: None,
            final_response: None,
            history: Vec::new(),
            selected_strategy: None,
            stage_results: Vec::new(),
            errors: Vec::new(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Merge a stage envelope into the state. An existing record for the
    /// same stage is replaced in place; slots filled by the stage itself
    /// are untouched.
    pub fn record_stage(&mut self, result: StageResult) {
        if let Some(existing) = self
            .stage_results
            .iter_mut()
            .find(|r| r.stage == result.stage)
        {
            *existing = result;
        } else {
            self.stage_results.push(result);
        }
    }

    /// Append an error. Errors only ever grow within a run.
    pub fn push_error(&mut self, stage: StageKind, message: impl Into<String>) {
        self.errors.push(RunError {
            stage,
            message: message.into(),
        });
    }

    /// The top-ranked retrieved chunk, if any.
    pub fn top_result(&self) -> Option<&SearchResult> {
        self.retrieved_context.first()
    }

    /// Mark the run finished. Status is `Failed` iff any error was
    /// accumulated, `Completed` otherwise.
    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
        self.status = if self.errors.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
    }

    /// Total wall-clock duration, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Aggregated run metrics included in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Per-stage wall-clock timings, keyed by stage name.
    pub stage_timings: BTreeMap<String, u64>,

    /// Token usage summed across all completion calls.
    pub token_usage: TokenUsage,

    /// Completed stages over total stages executed.
    pub success_rate: f32,

    pub average_stage_time_ms: f64,

    /// Retrieval strategy chosen for this run, by name.
    pub strategy: Option<String>,
}

/// Final answer record returned by the workflow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub response: String,
    pub status: RunStatus,
    pub run_id: Uuid,
    pub conversation_id: Option<String>,
    pub metadata: RunMetrics,
    pub errors: Vec<RunError>,
}
