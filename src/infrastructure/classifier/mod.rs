//! Document classifier adapters.

pub mod completion_classifier;

pub use completion_classifier::CompletionClassifier;
