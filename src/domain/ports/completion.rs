use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::TokenUsage;

/// Free-text completion returned by the service.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Port for the completion service collaborator.
///
/// Takes a system+user message pair and returns free text. The service
/// enforces its own timeout; a timeout surfaces as an error here and is
/// converted into a failed stage by the engine envelope.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion>;
}
