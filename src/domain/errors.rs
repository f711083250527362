//! Domain errors for the Attest pipeline.

use thiserror::Error;

use crate::domain::models::StageKind;

/// Domain-level errors that can occur in the Attest system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Stage {stage} failed: {message}")]
    StageExecution { stage: StageKind, message: String },

    #[error("Analysis parse failed: {0}")]
    AnalysisParseFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Completion service error: {0}")]
    CompletionFailed(String),

    #[error("Retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Wrap a collaborator error as a stage execution failure,
    /// preserving the original message.
    pub fn stage(stage: StageKind, err: impl std::fmt::Display) -> Self {
        DomainError::StageExecution {
            stage,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
