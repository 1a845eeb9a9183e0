//! causegraph-embeddings - Embedding provider implementations for causegraph.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - any OpenAI-compatible embeddings endpoint
//! - **DeepInfra** (feature: `openai`) - the same client pointed at DeepInfra's
//!   OpenAI-compatible API, default model `Qwen/Qwen3-Embedding-8B`
//!
//! # Example
//!
//! ```ignore
//! use causegraph_embeddings::EmbedderFactory;
//!
//! // DeepInfra with the default model
//! let embedder = EmbedderFactory::deepinfra()?;
//!
//! // Or OpenAI with a specific model
//! let embedder = EmbedderFactory::openai_with_model("text-embedding-3-large", 3072)?;
//! ```

mod factory;
mod openai;

pub use factory::EmbedderFactory;
pub use openai::OpenAIEmbedder;

// Re-export core types for convenience
pub use causegraph_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};
