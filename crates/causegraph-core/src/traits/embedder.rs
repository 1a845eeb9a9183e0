//! Embedder trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CgResult;

/// Core Embedder trait - all embedding providers implement this.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> CgResult<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch).
    async fn embed_batch(&self, texts: &[String]) -> CgResult<Vec<Vec<f32>>> {
        // Default implementation: sequential embedding
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the dimension of the embeddings.
    fn dimension(&self) -> usize;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// Embedder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Model name/identifier.
    pub model: String,
    /// Embedding dimensions.
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    /// API key (if not using environment variable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_embedding_dims() -> usize {
    4096
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model: "Qwen/Qwen3-Embedding-8B".to_string(),
            embedding_dims: default_embedding_dims(),
            api_key: None,
            base_url: Some(DEEPINFRA_BASE_URL.to_string()),
        }
    }
}

/// OpenAI-compatible endpoint of DeepInfra.
pub const DEEPINFRA_BASE_URL: &str = "https://api.deepinfra.com/v1/openai";

/// Embedder provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderProvider {
    /// Any OpenAI-compatible endpoint (OpenAI itself or DeepInfra via `base_url`).
    #[default]
    OpenAI,
    DeepInfra,
}
