//! Core traits for causegraph providers.

mod embedder;
mod llm;

pub use embedder::*;
pub use llm::*;
