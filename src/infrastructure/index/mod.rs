//! Document index infrastructure.

pub mod memory_index;

pub use memory_index::{IndexedDocument, InMemoryIndex};
