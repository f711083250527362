//! The seven pipeline stage implementations.
//!
//! Each stage wraps exactly one collaborator call, fills its slot on the
//! run state, and returns a small summary for the stage envelope. The
//! engine owns timing, error capture, and telemetry; this module owns
//! what each stage actually does.
//!
//! Degraded-result stages (question analysis, regulatory search,
//! response synthesis) always leave a well-shaped payload in their slot
//! before propagating a collaborator error, so downstream stages never
//! see a malformed input.

use std::sync::Arc;

use serde_json::json;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ClassificationMode, Config, QuestionAnalysis, RunState, SearchFilters, StageKind, TokenUsage,
};
use crate::domain::ports::{
    CompletionService, ConversationStore, DocumentClassifier, GuidanceSource,
};
use crate::services::retrieval::RetrievalEngine;
use crate::services::strategy::StrategySelector;

/// Answer returned when synthesis produced nothing usable.
pub const APOLOGETIC_RESPONSE: &str = "I'm sorry - I was unable to analyze the available audit \
documentation for this question. Please try rephrasing it or narrowing it to a specific document \
or framework. Sources: none.";

/// Guidance text substituted when regulatory search fails.
pub const REGULATORY_FALLBACK: &str = "No external regulatory guidance was available for this \
run. Answer from the retrieved audit evidence alone and flag any framework requirement that \
could not be verified.";

const ANALYST_SYSTEM_PROMPT: &str = "You are an audit question analyst. Respond with a single \
JSON object with keys: complexity (basic|intermediate|advanced), question_type, topics, \
frameworks, document_types. No prose.";

const COMPLIANCE_SYSTEM_PROMPT: &str = "You are a compliance analyst. Assess the evidence \
excerpts against the question and identify control gaps, findings, and their severity.";

const SYNTHESIS_SYSTEM_PROMPT: &str = "You are an audit assistant. Answer the question using \
the provided analysis, evidence excerpts, and regulatory guidance. Cite document ids for every \
claim drawn from the evidence.";

/// Per-stage output handed back to the engine envelope.
pub struct StageOutput {
    pub summary: serde_json::Value,
    pub usage: Option<TokenUsage>,
}

impl StageOutput {
    fn new(summary: serde_json::Value) -> Self {
        Self {
            summary,
            usage: None,
        }
    }

    fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }
}

/// Collaborator bundle behind the stage implementations.
pub struct PipelineStages {
    completion: Arc<dyn CompletionService>,
    classifier: Arc<dyn DocumentClassifier>,
    guidance: Arc<dyn GuidanceSource>,
    conversations: Arc<dyn ConversationStore>,
    retrieval: Arc<RetrievalEngine>,
    selector: StrategySelector,
    config: Config,
}

impl PipelineStages {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        classifier: Arc<dyn DocumentClassifier>,
        guidance: Arc<dyn GuidanceSource>,
        conversations: Arc<dyn ConversationStore>,
        retrieval: Arc<RetrievalEngine>,
        config: Config,
    ) -> Self {
        Self {
            completion,
            classifier,
            guidance,
            conversations,
            retrieval,
            selector: StrategySelector::new(),
            config,
        }
    }

    /// Execute one stage against the run state. Exhaustive over
    /// [`StageKind`]; adding a stage without handling it here fails to
    /// compile.
    pub async fn execute(&self, kind: StageKind, state: &mut RunState) -> DomainResult<StageOutput> {
        match kind {
            StageKind::Initialize => self.initialize(state).await,
            StageKind::AnalyzeQuestion => self.analyze_question(state).await,
            StageKind::RetrieveContext => self.retrieve_context(state).await,
            StageKind::ClassifyDocuments => self.classify_documents(state).await,
            StageKind::AnalyzeCompliance => self.analyze_compliance(state).await,
            StageKind::RegulatorySearch => self.regulatory_search(state).await,
            StageKind::SynthesizeResponse => self.synthesize_response(state).await,
        }
    }

    /// Load conversation history into the run state.
    async fn initialize(&self, state: &mut RunState) -> DomainResult<StageOutput> {
        if let Some(conversation_id) = state.conversation_id.clone() {
            state.history = self.conversations.get(&conversation_id).await;
        }
        Ok(StageOutput::new(json!({
            "history_turns": state.history.len(),
        })))
    }

    /// Ask the completion service to describe the question; fall back to
    /// the keyword heuristic when the response does not parse or the
    /// call fails.
    async fn analyze_question(&self, state: &mut RunState) -> DomainResult<StageOutput> {
        let user_prompt = format!("Question: {}", state.question);

        match self
            .completion
            .complete(ANALYST_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(completion) => {
                let (analysis, defaulted) = match QuestionAnalysis::parse(&completion.text) {
                    Ok(parsed) => (parsed, false),
                    Err(err) => {
                        tracing::debug!(%err, "analysis response did not parse, using fallback");
                        (QuestionAnalysis::fallback(&state.question), true)
                    }
                };
                let summary = json!({
                    "complexity": analysis.complexity,
                    "frameworks": analysis.frameworks,
                    "defaulted": defaulted,
                });
                state.question_analysis = Some(analysis);
                Ok(StageOutput::new(summary).with_usage(completion.usage))
            }
            Err(err) => {
                // Downstream stages still get a well-shaped analysis.
                state.question_analysis = Some(QuestionAnalysis::fallback(&state.question));
                Err(DomainError::stage(StageKind::AnalyzeQuestion, err))
            }
        }
    }

    /// Select a retrieval strategy and fetch supporting chunks.
    async fn retrieve_context(&self, state: &mut RunState) -> DomainResult<StageOutput> {
        let analysis = state
            .question_analysis
            .clone()
            .unwrap_or_else(|| QuestionAnalysis::fallback(&state.question));

        let selection = self
            .selector
            .select(&state.question, analysis.complexity, &analysis);
        state.selected_strategy = Some(selection.strategy.name().to_string());
        tracing::info!(
            strategy = %selection.strategy,
            reason = %selection.reason,
            "retrieval strategy selected"
        );

        let filters = self.retrieval_filters(state, &analysis);
        let results = self
            .retrieval
            .retrieve(
                selection.strategy,
                &state.question,
                self.config.retrieval.limit,
                filters.as_ref(),
                &analysis.frameworks,
            )
            .await
            .map_err(|err| DomainError::stage(StageKind::RetrieveContext, err))?;

        let summary = json!({
            "strategy": selection.strategy.name(),
            "results": results.len(),
        });
        state.retrieved_context = results;
        Ok(StageOutput::new(summary))
    }

    /// Classify the top chunk (single-document mode) or every chunk
    /// (multi-document mode).
    async fn classify_documents(&self, state: &mut RunState) -> DomainResult<StageOutput> {
        let chunks: Vec<(String, String)> = match state.classification_mode {
            ClassificationMode::SingleDocument => state
                .top_result()
                .map(|r| (r.document_id.clone(), r.content.clone()))
                .into_iter()
                .collect(),
            ClassificationMode::MultiDocument => state
                .retrieved_context
                .iter()
                .map(|r| (r.document_id.clone(), r.content.clone()))
                .collect(),
        };

        for (document_id, content) in chunks {
            let classification = self
                .classifier
                .classify(&content)
                .await
                .map_err(|err| DomainError::stage(StageKind::ClassifyDocuments, err))?;
            state
                .classifications
                .push(classification.for_document(document_id));
        }

        Ok(StageOutput::new(json!({
            "mode": state.classification_mode,
            "classified": state.classifications.len(),
        })))
    }

    /// Produce the compliance analysis over the retrieved context.
    async fn analyze_compliance(&self, state: &mut RunState) -> DomainResult<StageOutput> {
        let user_prompt = build_compliance_prompt(state);
        let completion = self
            .completion
            .complete(COMPLIANCE_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|err| DomainError::stage(StageKind::AnalyzeCompliance, err))?;

        let summary = json!({"analysis_chars": completion.text.len()});
        state.compliance_analysis = Some(completion.text);
        Ok(StageOutput::new(summary).with_usage(completion.usage))
    }

    /// Fetch regulatory guidance; substitute the static fallback when the
    /// collaborator fails or has nothing useful.
    async fn regulatory_search(&self, state: &mut RunState) -> DomainResult<StageOutput> {
        let analysis = state.question_analysis.as_ref();
        let framework = analysis.and_then(|a| a.frameworks.first()).cloned();
        let document_type = state
            .classifications
            .first()
            .map(|c| c.document_type.clone());

        match self
            .guidance
            .search_guidance(&state.question, document_type.as_deref(), framework.as_deref())
            .await
        {
            Ok(response) if response.success && !response.insights.is_empty() => {
                let insight_count = response.insights.len();
                state.regulatory_context = Some(response.insights.join("\n"));
                Ok(StageOutput::new(json!({"insights": insight_count})))
            }
            Ok(response) => {
                // Unsuccessful lookup is not a failure; use the
                // collaborator's message or our static fallback.
                state.regulatory_context = Some(
                    response
                        .fallback_message
                        .unwrap_or_else(|| REGULATORY_FALLBACK.to_string()),
                );
                Ok(StageOutput::new(json!({"insights": 0, "fallback": true})))
            }
            Err(err) => {
                state.regulatory_context = Some(REGULATORY_FALLBACK.to_string());
                Err(DomainError::stage(StageKind::RegulatorySearch, err))
            }
        }
    }

    /// Compose the final answer from every filled slot.
    async fn synthesize_response(&self, state: &mut RunState) -> DomainResult<StageOutput> {
        let user_prompt = build_synthesis_prompt(state);

        match self
            .completion
            .complete(SYNTHESIS_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(completion) => {
                let summary = json!({"response_chars": completion.text.len()});
                state.final_response = Some(completion.text);
                Ok(StageOutput::new(summary).with_usage(completion.usage))
            }
            Err(err) => {
                state.final_response = Some(APOLOGETIC_RESPONSE.to_string());
                Err(DomainError::stage(StageKind::SynthesizeResponse, err))
            }
        }
    }

    /// Metadata filters for this run: the requested document id plus any
    /// frameworks the analysis detected. The engine's recall fallback
    /// keeps over-strict filters from emptying the result set.
    fn retrieval_filters(
        &self,
        state: &RunState,
        analysis: &QuestionAnalysis,
    ) -> Option<SearchFilters> {
        let mut filters = SearchFilters::new();
        if let Some(document_id) = &state.document_id {
            filters.insert("document_id".to_string(), json!(document_id));
        }
        if !analysis.frameworks.is_empty() {
            filters.insert("frameworks".to_string(), json!(analysis.frameworks));
        }
        if filters.is_empty() {
            None
        } else {
            Some(filters)
        }
    }
}

/// Evidence excerpts block shared by the analysis and synthesis prompts.
fn format_context(state: &RunState) -> String {
    if state.retrieved_context.is_empty() {
        return "No supporting documents were retrieved.".to_string();
    }
    state
        .retrieved_context
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[Excerpt {} | {} | score {:.2}]\n{}",
                i + 1,
                if r.document_id.is_empty() {
                    "unknown"
                } else {
                    &r.document_id
                },
                r.combined_score,
                r.content,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_compliance_prompt(state: &RunState) -> String {
    let classifications = if state.classifications.is_empty() {
        "none".to_string()
    } else {
        state
            .classifications
            .iter()
            .map(|c| {
                format!(
                    "{} (risk: {:?}, frameworks: {})",
                    c.document_type,
                    c.risk_level,
                    c.frameworks.join(", "),
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        "## Question\n{}\n\n## Document classifications\n{}\n\n## Evidence\n{}",
        state.question,
        classifications,
        format_context(state),
    )
}

fn build_synthesis_prompt(state: &RunState) -> String {
    let history = if state.history.is_empty() {
        String::new()
    } else {
        let turns = state
            .history
            .iter()
            .map(|t| format!("Q: {}\nA: {}", t.question, t.response))
            .collect::<Vec<_>>()
            .join("\n");
        format!("## Conversation so far\n{turns}\n\n")
    };

    format!(
        "{}## Question\n{}\n\n## Compliance analysis\n{}\n\n## Regulatory guidance\n{}\n\n## Evidence\n{}",
        history,
        state.question,
        state
            .compliance_analysis
            .as_deref()
            .unwrap_or("No compliance analysis was produced."),
        state
            .regulatory_context
            .as_deref()
            .unwrap_or(REGULATORY_FALLBACK),
        format_context(state),
    )
}
