use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::DocumentClassification;

/// Port for the document classifier collaborator.
///
/// Invoked once per run in single-document mode, or once per retrieved
/// chunk in multi-document mode.
#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    async fn classify(&self, content: &str) -> Result<DocumentClassification>;
}
