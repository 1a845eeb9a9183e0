//! causegraph-llm - LLM provider implementations for causegraph.
//!
//! # Supported Providers
//!
//! - **Anthropic** - Claude models through the Messages API
//!
//! # Example
//!
//! ```ignore
//! use causegraph_llm::LlmFactory;
//!
//! let llm = LlmFactory::anthropic()?;
//! let llm = LlmFactory::anthropic_with_model("claude-sonnet-4-20250514")?;
//! ```

mod anthropic;
mod factory;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;

// Re-export core types for convenience
pub use causegraph_core::traits::{GenerationOptions, Llm, LlmConfig, LlmProvider, LlmResponse};
