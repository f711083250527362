//! Best-effort, forward-only workflow engine.
//!
//! Threads one exclusively-owned [`RunState`] through the ordered stage
//! sequence and produces the final answer record. The engine always
//! advances: a stage failure is captured by the uniform envelope,
//! appended to the run's error list, and the next stage runs anyway.
//! There is no retry, cancellation, or workflow-level timeout;
//! collaborators enforce their own deadlines.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::errors::DomainError;
use crate::domain::models::{
    Config, ConversationTurn, RunMetrics, RunReport, RunRequest, RunState, StageKind, StageResult,
    TokenUsage,
};
use crate::domain::ports::{ConversationStore, Telemetry};
use crate::services::stages::{PipelineStages, APOLOGETIC_RESPONSE};

/// Drives one run through the seven-stage pipeline.
pub struct WorkflowEngine {
    stages: PipelineStages,
    conversations: Arc<dyn ConversationStore>,
    telemetry: Arc<dyn Telemetry>,
    config: Config,
}

impl WorkflowEngine {
    pub fn new(
        stages: PipelineStages,
        conversations: Arc<dyn ConversationStore>,
        telemetry: Arc<dyn Telemetry>,
        config: Config,
    ) -> Self {
        Self {
            stages,
            conversations,
            telemetry,
            config,
        }
    }

    /// Run the full pipeline for one question.
    ///
    /// Always returns a report with a non-empty response; the terminal
    /// state is always reached regardless of stage failures. Final
    /// status is `Failed` iff any stage accumulated an error.
    pub async fn run(&self, request: RunRequest) -> RunReport {
        let mut state = RunState::new(&request);
        tracing::info!(
            run_id = %state.run_id,
            question = %state.question,
            "starting pipeline run"
        );

        for kind in StageKind::ORDERED {
            self.run_stage(kind, &mut state).await;
        }

        state.finish();
        let duration_ms = state.duration_ms().unwrap_or(0).max(0) as u64;
        self.telemetry
            .log_run(state.run_id, state.status, duration_ms, state.errors.len());

        // Top-level guard: a best-effort answer is always returned, even
        // when every stage failed.
        let response = state
            .final_response
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| APOLOGETIC_RESPONSE.to_string());

        if let Some(conversation_id) = &state.conversation_id {
            self.conversations
                .append(
                    conversation_id,
                    ConversationTurn::new(state.question.clone(), response.clone()),
                )
                .await;
            self.conversations
                .trim(conversation_id, self.config.conversation.max_turns)
                .await;
        }

        RunReport {
            response,
            status: state.status,
            run_id: state.run_id,
            conversation_id: state.conversation_id.clone(),
            metadata: build_metrics(&state),
            errors: state.errors.clone(),
        }
    }

    /// Uniform stage envelope: time the stage, convert any collaborator
    /// error into a failed stage result with the original message,
    /// merge the envelope into the state, and emit telemetry.
    async fn run_stage(&self, kind: StageKind, state: &mut RunState) {
        let started = Instant::now();
        let outcome = self.stages.execute(kind, state).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(output) => StageResult::completed(kind, output.summary, duration_ms)
                .with_usage(output.usage),
            Err(err) => {
                let message = stage_error_message(err);
                tracing::warn!(stage = %kind, error = %message, "stage failed, continuing");
                state.push_error(kind, message.clone());
                StageResult::failed(kind, message, duration_ms)
            }
        };

        self.telemetry
            .log_stage(state.run_id, kind, result.status, duration_ms);
        state.record_stage(result);
    }
}

/// The collaborator's message, without the stage prefix the error type
/// adds for display elsewhere.
fn stage_error_message(err: DomainError) -> String {
    match err {
        DomainError::StageExecution { message, .. } => message,
        other => other.to_string(),
    }
}

fn build_metrics(state: &RunState) -> RunMetrics {
    let mut stage_timings = BTreeMap::new();
    let mut token_usage = TokenUsage::default();
    let mut completed = 0usize;

    for result in &state.stage_results {
        stage_timings.insert(result.stage.name().to_string(), result.duration_ms);
        if let Some(usage) = result.token_usage {
            token_usage.accumulate(usage);
        }
        if result.is_completed() {
            completed += 1;
        }
    }

    let total = state.stage_results.len();
    let success_rate = if total == 0 {
        0.0
    } else {
        completed as f32 / total as f32
    };
    let average_stage_time_ms = if total == 0 {
        0.0
    } else {
        stage_timings.values().sum::<u64>() as f64 / total as f64
    };

    RunMetrics {
        stage_timings,
        token_usage,
        success_rate,
        average_stage_time_ms,
        strategy: state.selected_strategy.clone(),
    }
}
