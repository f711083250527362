//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that collaborators must
//! implement:
//! - `DocumentIndex` / `KeywordIndex`: document retrieval
//! - `CompletionService`: free-text completion
//! - `DocumentClassifier`: chunk classification
//! - `GuidanceSource`: regulatory web guidance
//! - `ConversationStore`: conversation history
//! - `Telemetry`: fire-and-forget run/stage logging
//!
//! These traits define the contracts that allow the pipeline to be
//! independent of specific infrastructure implementations.

pub mod classifier;
pub mod completion;
pub mod conversation;
pub mod document_index;
pub mod guidance;
pub mod telemetry;

pub use classifier::DocumentClassifier;
pub use completion::{Completion, CompletionService};
pub use conversation::ConversationStore;
pub use document_index::{DocumentIndex, KeywordIndex};
pub use guidance::{GuidanceResponse, GuidanceSource, NullGuidance};
pub use telemetry::{NullTelemetry, Telemetry, TracingTelemetry};
