//! Common test utilities for integration tests
//!
//! Provides shared mock collaborators and fixtures used across multiple
//! integration test files.

// Each integration test binary compiles its own copy of this module and
// uses a different subset of it.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;

use attest::domain::models::{
    matches_filters, Config, DocumentClassification, KeywordHit, RiskLevel, SearchFilters,
    SearchResult, TokenUsage,
};
use attest::domain::ports::{
    Completion, CompletionService, DocumentClassifier, DocumentIndex, GuidanceSource,
    GuidanceResponse, KeywordIndex, NullTelemetry,
};
use attest::services::{
    InMemoryConversationStore, PipelineStages, RetrievalCache, RetrievalEngine, WorkflowEngine,
};

/// Fixed audit corpus used by the pipeline tests.
pub fn corpus() -> Vec<SearchResult> {
    vec![
        make_result(
            "sox-404-1",
            "SOX 404 testing identified a material weakness in change management controls",
            0.95,
            json!({"document_type": "control_testing", "company": "Acme", "frameworks": ["SOX"]}),
        ),
        make_result(
            "access-1",
            "Quarterly access review flagged terminated contractors retaining access",
            0.82,
            json!({"document_type": "access_review", "company": "Acme", "frameworks": ["SOX"]}),
        ),
        make_result(
            "recon-1",
            "Financial reconciliation exceptions exceeded the materiality threshold",
            0.71,
            json!({"document_type": "financial_reconciliation", "company": "Globex",
                   "frameworks": ["SOX"]}),
        ),
        make_result(
            "risk-1",
            "Risk assessment scored vendor management as high residual risk",
            0.64,
            json!({"document_type": "risk_assessment", "company": "Globex",
                   "frameworks": ["ISO 27001"]}),
        ),
        make_result(
            "policy-1",
            "Information security policy mandates annual control self-assessments",
            0.52,
            json!({"document_type": "policy", "company": "Initech",
                   "frameworks": ["ISO 27001"]}),
        ),
    ]
}

pub fn make_result(id: &str, content: &str, score: f32, metadata: serde_json::Value) -> SearchResult {
    SearchResult::semantic(id.to_string(), content.to_string(), score, metadata)
}

/// Semantic index stub returning the fixed corpus, recording queries.
pub struct MockIndex {
    pub results: Vec<SearchResult>,
    pub queries: Mutex<Vec<String>>,
}

impl MockIndex {
    pub fn with_corpus() -> Self {
        Self {
            results: corpus(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentIndex for MockIndex {
    async fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        _score_threshold: Option<f32>,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        let mut results: Vec<SearchResult> = self
            .results
            .iter()
            .filter(|r| filters.is_none_or(|f| matches_filters(&r.metadata, f)))
            .cloned()
            .collect();
        results.truncate(limit);
        Ok(results)
    }
}

#[async_trait]
impl KeywordIndex for MockIndex {
    async fn relevant(&self, query: &str) -> Result<Vec<KeywordHit>> {
        let lowered = query.to_lowercase();
        Ok(self
            .results
            .iter()
            .filter(|r| {
                lowered
                    .split_whitespace()
                    .any(|t| t.len() > 3 && r.content.to_lowercase().contains(t))
            })
            .map(|r| KeywordHit {
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                document_id: Some(r.document_id.clone()),
            })
            .collect())
    }
}

/// Completion stub that answers every prompt with canned text.
pub struct MockCompletion {
    pub analysis_json: Option<String>,
    pub calls: AtomicUsize,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            analysis_json: Some(
                r#"{"complexity": "intermediate", "question_type": "factual",
                    "topics": ["internal controls"], "frameworks": [], "document_types": []}"#
                    .to_string(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, system: &str, _user: &str) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = if system.contains("question analyst") {
            self.analysis_json
                .clone()
                .unwrap_or_else(|| "not json".to_string())
        } else if system.contains("compliance analyst") {
            "One material weakness in change management; remediation is in progress.".to_string()
        } else {
            "Based on the evidence, change management controls show a material weakness \
             [sox-404-1]."
                .to_string()
        };
        Ok(Completion::new(text).with_usage(TokenUsage::new(120, 40)))
    }
}

/// Completion stub that always fails.
pub struct FailingCompletion;

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<Completion> {
        Err(anyhow!("completion service timed out"))
    }
}

/// Classifier stub returning a fixed classification.
pub struct MockClassifier;

#[async_trait]
impl DocumentClassifier for MockClassifier {
    async fn classify(&self, _content: &str) -> Result<DocumentClassification> {
        Ok(DocumentClassification {
            document_type: "control_testing".to_string(),
            frameworks: vec!["SOX".to_string()],
            risk_level: RiskLevel::High,
            confidence: 0.9,
            document_id: None,
        })
    }
}

/// Classifier stub that always fails.
pub struct FailingClassifier;

#[async_trait]
impl DocumentClassifier for FailingClassifier {
    async fn classify(&self, _content: &str) -> Result<DocumentClassification> {
        Err(anyhow!("classifier unavailable"))
    }
}

/// Guidance stub returning one insight.
pub struct MockGuidance;

#[async_trait]
impl GuidanceSource for MockGuidance {
    async fn search_guidance(
        &self,
        _query: &str,
        _document_type: Option<&str>,
        _framework: Option<&str>,
    ) -> Result<GuidanceResponse> {
        Ok(GuidanceResponse::with_insights(vec![
            "PCAOB AS 2201 requires testing of entity-level controls.".to_string(),
        ]))
    }
}

/// Guidance stub that always fails.
pub struct FailingGuidance;

#[async_trait]
impl GuidanceSource for FailingGuidance {
    async fn search_guidance(
        &self,
        _query: &str,
        _document_type: Option<&str>,
        _framework: Option<&str>,
    ) -> Result<GuidanceResponse> {
        Err(anyhow!("guidance service unreachable"))
    }
}

/// Everything needed to assemble an engine, with handles kept for
/// assertions.
pub struct Harness {
    pub index: Arc<MockIndex>,
    pub cache: Arc<RetrievalCache>,
    pub conversations: Arc<InMemoryConversationStore>,
    pub config: Config,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self {
            index: Arc::new(MockIndex::with_corpus()),
            cache: Arc::new(RetrievalCache::new(100, Duration::from_secs(60))),
            conversations: Arc::new(InMemoryConversationStore::new()),
            config: Config::default(),
        }
    }

    /// Build an engine around the given completion/classifier/guidance
    /// collaborators.
    pub fn engine(
        &self,
        completion: Arc<dyn CompletionService>,
        classifier: Arc<dyn DocumentClassifier>,
        guidance: Arc<dyn GuidanceSource>,
    ) -> WorkflowEngine {
        let retrieval = Arc::new(RetrievalEngine::new(
            self.index.clone(),
            Some(self.index.clone()),
            self.cache.clone(),
            self.config.retrieval.clone(),
        ));
        let stages = PipelineStages::new(
            completion,
            classifier,
            guidance,
            self.conversations.clone(),
            retrieval,
            self.config.clone(),
        );
        WorkflowEngine::new(
            stages,
            self.conversations.clone(),
            Arc::new(NullTelemetry::new()),
            self.config.clone(),
        )
    }
}
