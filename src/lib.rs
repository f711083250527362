//! Attest - Audit & Compliance Question Answering
//!
//! Attest answers audit and compliance questions over ingested documents
//! by routing each question through a strictly ordered, best-effort
//! analysis pipeline backed by adaptive retrieval.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure business logic and domain models
//! - **Service Layer** (`services`): Pipeline engine, retrieval, cache, fusion
//! - **Infrastructure Layer** (`infrastructure`): External integrations and adapters
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use attest::domain::models::RunRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Wire collaborators into a WorkflowEngine and run a question
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    ClassificationMode, Complexity, Config, DocumentClassification, QuestionAnalysis, RunReport,
    RunRequest, RunStatus, SearchFilters, SearchResult, StageKind, StageResult, TokenUsage,
};
pub use domain::ports::{
    CompletionService, ConversationStore, DocumentClassifier, DocumentIndex, GuidanceSource,
    KeywordIndex, Telemetry,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    InMemoryConversationStore, PipelineStages, RetrievalCache, RetrievalEngine, RetrievalStrategy,
    StrategySelector, WorkflowEngine,
};
