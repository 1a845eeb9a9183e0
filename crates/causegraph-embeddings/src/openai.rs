//! OpenAI-compatible embedding provider.

use async_trait::async_trait;

use causegraph_core::error::{CausegraphError, CgResult};
use causegraph_core::traits::{Embedder, EmbedderConfig};

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};

/// Embedder for OpenAI and OpenAI-compatible endpoints.
pub struct OpenAIEmbedder {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    config: EmbedderConfig,
}

impl OpenAIEmbedder {
    /// Create a new embedder.
    ///
    /// The API key comes from the config, then from `api_key_var`.
    pub fn new(config: EmbedderConfig, api_key_var: &str) -> CgResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(api_key_var).ok())
            .ok_or_else(|| {
                CausegraphError::Configuration(format!(
                    "Embedding API key not found. Set {} or provide api_key in config.",
                    api_key_var
                ))
            })?;

        #[cfg(feature = "openai")]
        let openai_config = match config.base_url {
            Some(ref base_url) => OpenAIConfig::new().with_api_key(api_key).with_api_base(base_url),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        #[cfg(not(feature = "openai"))]
        let _ = api_key;

        Ok(Self {
            #[cfg(feature = "openai")]
            client: Client::with_config(openai_config),
            config,
        })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.config.base_url.as_deref()
    }
}

#[cfg(feature = "openai")]
fn map_error(err: OpenAIError) -> CausegraphError {
    match err {
        OpenAIError::Reqwest(e) => CausegraphError::embedding_connection(format!("Embedding request failed: {}", e)),
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.clone().unwrap_or_default();
            if kind.contains("authentication") || api.message.contains("API key") {
                CausegraphError::authentication(api.message)
            } else if kind.contains("invalid_request") {
                CausegraphError::Configuration(format!("Embedding request rejected: {}", api.message))
            } else {
                CausegraphError::embedding(format!("Embedding API error: {}", api.message))
            }
        }
        OpenAIError::InvalidArgument(msg) => CausegraphError::Configuration(msg),
        other => CausegraphError::embedding(format!("Embedding error: {}", other)),
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[cfg(feature = "openai")]
    async fn embed(&self, text: &str) -> CgResult<Vec<f32>> {
        let request = CreateEmbeddingRequest {
            model: self.config.model.clone(),
            input: EmbeddingInput::String(text.to_string()),
            ..Default::default()
        };

        let response = self.client.embeddings().create(request).await.map_err(map_error)?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CausegraphError::embedding("No embedding returned"))?;

        Ok(embedding.embedding)
    }

    #[cfg(not(feature = "openai"))]
    async fn embed(&self, _text: &str) -> CgResult<Vec<f32>> {
        Err(CausegraphError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    #[cfg(feature = "openai")]
    async fn embed_batch(&self, texts: &[String]) -> CgResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequest {
            model: self.config.model.clone(),
            input: EmbeddingInput::StringArray(texts.to_vec()),
            ..Default::default()
        };

        let response = self.client.embeddings().create(request).await.map_err(map_error)?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        if data.len() != texts.len() {
            return Err(CausegraphError::embedding(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                data.len()
            )));
        }
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dims
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_and_base_url() {
        let config = EmbedderConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let embedder = OpenAIEmbedder::new(config, "CAUSEGRAPH_TEST_UNSET_KEY").unwrap();
        assert_eq!(embedder.model_name(), "Qwen/Qwen3-Embedding-8B");
        assert_eq!(embedder.dimension(), 4096);
        assert_eq!(embedder.base_url(), Some("https://api.deepinfra.com/v1/openai"));
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = EmbedderConfig {
            api_key: None,
            ..Default::default()
        };
        let err = OpenAIEmbedder::new(config, "CAUSEGRAPH_TEST_UNSET_KEY").err().unwrap();
        assert!(matches!(err, CausegraphError::Configuration(_)));
        assert!(err.to_string().contains("CAUSEGRAPH_TEST_UNSET_KEY"));
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_error_mapping() {
        let err = map_error(OpenAIError::InvalidArgument("bad".to_string()));
        assert!(!err.is_transient());

        let err = map_error(OpenAIError::StreamError("reset".to_string()));
        assert!(err.is_transient());
    }

    #[cfg(feature = "openai")]
    fn unreachable_embedder() -> OpenAIEmbedder {
        let config = EmbedderConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some("http://127.0.0.1:9/v1".to_string()),
            ..Default::default()
        };
        OpenAIEmbedder::new(config, "CAUSEGRAPH_TEST_UNSET_KEY").unwrap()
    }

    #[cfg(feature = "openai")]
    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let embeddings = unreachable_embedder().embed_batch(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }

    #[cfg(feature = "openai")]
    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient_connection_error() {
        let err = unreachable_embedder().embed("human|student").await.unwrap_err();
        assert_eq!(err.code(), causegraph_core::error::ErrorCode::EmbConnectionFailed);
        assert!(err.is_transient());
    }
}
