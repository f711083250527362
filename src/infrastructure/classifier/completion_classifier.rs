//! Completion-backed document classifier.
//!
//! Asks the completion service to classify a chunk as JSON; a response
//! that does not parse falls back to the documented keyword default. A
//! failed completion call propagates so the stage envelope can record
//! it.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::DocumentClassification;
use crate::domain::ports::{CompletionService, DocumentClassifier};

const CLASSIFIER_SYSTEM_PROMPT: &str = "You are an audit document classifier. Respond with a \
single JSON object with keys: document_type, frameworks, risk_level (low|medium|high), \
confidence. No prose.";

/// Most content characters sent per classification call.
const MAX_CONTENT_CHARS: usize = 4000;

pub struct CompletionClassifier {
    completion: Arc<dyn CompletionService>,
}

impl CompletionClassifier {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl DocumentClassifier for CompletionClassifier {
    async fn classify(&self, content: &str) -> Result<DocumentClassification> {
        let excerpt: String = content.chars().take(MAX_CONTENT_CHARS).collect();
        let completion = self
            .completion
            .complete(CLASSIFIER_SYSTEM_PROMPT, &excerpt)
            .await?;

        Ok(DocumentClassification::parse(&completion.text).unwrap_or_else(|err| {
            tracing::debug!(%err, "classifier response did not parse, using keyword fallback");
            DocumentClassification::fallback(content)
        }))
    }
}
