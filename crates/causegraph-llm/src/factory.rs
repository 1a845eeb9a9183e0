//! Factory for creating LLM providers.

use std::sync::Arc;

use causegraph_core::error::CgResult;
use causegraph_core::traits::{Llm, LlmConfig, LlmProvider};

use crate::anthropic::AnthropicLlm;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> CgResult<Arc<dyn Llm>> {
        match provider {
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::new(config)?;
                Ok(Arc::new(llm))
            }
        }
    }

    /// Create an Anthropic LLM provider with default configuration.
    pub fn anthropic() -> CgResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::Anthropic, LlmConfig::default())
    }

    /// Create an Anthropic LLM provider with a specific model.
    pub fn anthropic_with_model(model: impl Into<String>) -> CgResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::Anthropic, config)
    }
}
