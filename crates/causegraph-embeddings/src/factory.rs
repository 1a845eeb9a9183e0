//! Factory for creating embedding providers.

use std::sync::Arc;

use causegraph_core::error::CgResult;
use causegraph_core::traits::{Embedder, EmbedderConfig, EmbedderProvider, DEEPINFRA_BASE_URL};

use crate::openai::OpenAIEmbedder;

/// Factory for creating embedding providers.
pub struct EmbedderFactory;

impl EmbedderFactory {
    /// Create an embedder from the given configuration.
    pub fn create(provider: EmbedderProvider, mut config: EmbedderConfig) -> CgResult<Arc<dyn Embedder>> {
        let embedder = match provider {
            EmbedderProvider::OpenAI => OpenAIEmbedder::new(config, "OPENAI_API_KEY")?,
            EmbedderProvider::DeepInfra => {
                config.base_url.get_or_insert_with(|| DEEPINFRA_BASE_URL.to_string());
                OpenAIEmbedder::new(config, "DEEPINFRA_API_KEY")?
            }
        };
        tracing::debug!(
            provider = ?provider,
            model = embedder.model_name(),
            base_url = embedder.base_url().unwrap_or("default"),
            "Created embedder"
        );
        Ok(Arc::new(embedder))
    }

    /// Create a DeepInfra embedder with default configuration.
    pub fn deepinfra() -> CgResult<Arc<dyn Embedder>> {
        Self::create(EmbedderProvider::DeepInfra, EmbedderConfig::default())
    }

    /// Create an OpenAI embedder with a specific model.
    pub fn openai_with_model(model: impl Into<String>, dims: usize) -> CgResult<Arc<dyn Embedder>> {
        let config = EmbedderConfig {
            model: model.into(),
            embedding_dims: dims,
            base_url: None,
            ..Default::default()
        };
        Self::create(EmbedderProvider::OpenAI, config)
    }
}
