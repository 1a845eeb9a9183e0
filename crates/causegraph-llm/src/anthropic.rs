//! Anthropic (Claude) LLM provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use causegraph_core::error::{CausegraphError, CgResult};
use causegraph_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
use causegraph_core::types::{Message, MessageRole};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic LLM provider.
pub struct AnthropicLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl AnthropicLlm {
    /// Create a new Anthropic LLM provider.
    pub fn new(config: LlmConfig) -> CgResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                CausegraphError::Configuration("Anthropic API key not found. Set ANTHROPIC_API_KEY environment variable or provide api_key in config.".to_string())
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            api_key
                .parse()
                .map_err(|_| CausegraphError::Configuration("Invalid API key format".to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            reqwest::header::HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CausegraphError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ANTHROPIC_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn build_request(&self, messages: &[Message], options: GenerationOptions) -> AnthropicRequest {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let conversation = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| AnthropicMessage {
                role: match m.role {
                    MessageRole::Assistant => "assistant",
                    _ => "user",
                },
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            top_p: options.top_p.or(self.config.top_p),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: conversation,
        }
    }
}

fn parse_response(body: &str) -> CgResult<LlmResponse> {
    let response: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| CausegraphError::llm(format!("Failed to parse response: {}", e)))?;

    let text: String = response
        .content
        .iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text.as_deref())
        .collect();

    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.input_tokens,
        completion_tokens: u.output_tokens,
        total_tokens: u.input_tokens + u.output_tokens,
    });

    Ok(LlmResponse {
        content: (!text.is_empty()).then_some(text),
        usage,
    })
}

fn error_from_status(status: u16, body: &str) -> CausegraphError {
    let message = serde_json::from_str::<AnthropicError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    CausegraphError::from_http_status(status, &format!("Anthropic API error: {}", message))
}

#[async_trait]
impl Llm for AnthropicLlm {
    async fn generate(&self, messages: &[Message], options: Option<GenerationOptions>) -> CgResult<LlmResponse> {
        let request = self.build_request(messages, options.unwrap_or_default());

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| CausegraphError::network(format!("Anthropic API request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CausegraphError::network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(error_from_status(status.as_u16(), &body));
        }

        let response = parse_response(&body)?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Anthropic generation complete"
            );
        }
        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm() -> AnthropicLlm {
        AnthropicLlm::new(LlmConfig {
            api_key: Some("sk-ant-test".to_string()),
            base_url: Some("http://localhost:9999/v1/".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_system_messages_are_lifted() {
        let llm = llm();
        let request = llm.build_request(
            &[
                Message::system("You label clusters."),
                Message::user("Label these."),
                Message::assistant("{"),
            ],
            GenerationOptions {
                max_tokens: Some(500),
                ..Default::default()
            },
        );

        assert_eq!(llm.base_url, "http://localhost:9999/v1");
        assert_eq!(request.system.as_deref(), Some("You label clusters."));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].role, "assistant");
        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.temperature, Some(0.1));

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("top_p").is_none());
        assert_eq!(json["model"], "claude-opus-4-1-20250805");
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let body = r#"{"content": [{"type": "text", "text": "{\"clusters\""}, {"type": "text", "text": ": {}}"}],
                       "usage": {"input_tokens": 10, "output_tokens": 4}}"#;
        let response = parse_response(body).unwrap();
        assert_eq!(response.content_or_empty(), r#"{"clusters": {}}"#);
        assert_eq!(response.usage.unwrap().total_tokens, 14);

        let empty = parse_response(r#"{"content": []}"#).unwrap();
        assert!(empty.content.is_none());
    }

    #[test]
    fn test_status_errors() {
        let body = r#"{"type": "error", "error": {"type": "rate_limit_error", "message": "slow down"}}"#;
        let err = error_from_status(429, body);
        assert!(err.is_transient());
        assert!(err.to_string().contains("slow down"));

        assert!(!error_from_status(401, "nope").is_transient());
        assert!(error_from_status(529, "overloaded").is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        let llm = AnthropicLlm::new(LlmConfig {
            api_key: Some("sk-ant-test".to_string()),
            base_url: Some("http://127.0.0.1:9/v1".to_string()),
            ..Default::default()
        })
        .unwrap();

        let err = llm.generate(&[Message::user("Label these.")], None).await.unwrap_err();
        assert!(matches!(err, CausegraphError::Network { .. }));
        assert!(err.is_transient());
    }
}
