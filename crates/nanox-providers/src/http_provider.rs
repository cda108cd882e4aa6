//! HTTP client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Works with any backend that speaks the OpenAI wire format (Moonshot,
//! OpenAI, DeepSeek, vLLM, ...). Non-success responses are classified into
//! [`ProviderError`] using the configured [`OverflowPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use nanox_core::config::schema::{ProviderConfig, SelfHealConfig};
use nanox_core::types::{
    ChatCompletionRequest, ChatCompletionResponse, LlmResponse, Message, ToolDefinition,
};

use crate::error::{OverflowPolicy, ProviderError};
use crate::traits::{LlmProvider, LlmRequestConfig};

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A provider that talks to one OpenAI-compatible HTTP API.
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.moonshot.cn/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    default_model: String,
    policy: OverflowPolicy,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl HttpProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        policy: OverflowPolicy,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
                reqwest::Client::new()
            });

        HttpProvider {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            default_model: model.into(),
            policy,
        }
    }

    /// Build from the `provider` and `selfHeal` config sections.
    pub fn from_config(provider: &ProviderConfig, self_heal: &SelfHealConfig) -> Self {
        Self::new(
            provider.api_base.clone(),
            provider.api_key.clone(),
            provider.model.clone(),
            Duration::from_secs(provider.timeout_secs),
            OverflowPolicy {
                statuses: self_heal.statuses.clone(),
                error_codes: self_heal.error_codes.clone(),
            },
        )
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, ProviderError> {
        debug!(
            model = %model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Calling LLM"
        );

        // An empty tool list is sent as "no tools" so tool_choice stays absent
        let tools = tools.filter(|t| !t.is_empty());

        let request_body = ChatCompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            tool_choice: tools.map(|_| "auto".to_string()),
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                ProviderError::network(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let err = ProviderError::from_status(status.as_u16(), &error_text, &self.policy);
            error!(
                status = %status,
                kind = ?err.kind,
                body = %err.message,
                "API error"
            );
            return Err(err);
        }

        let chat_resp = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse LLM response");
            ProviderError::decode(format!("Error parsing LLM response: {}", e))
        })?;

        let llm_resp = chat_resp
            .into_llm_response()
            .ok_or_else(|| ProviderError::decode("No choices in LLM response"))?;

        debug!(
            has_content = llm_resp.content.is_some(),
            tool_calls = llm_resp.tool_calls.len(),
            finish_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );
        Ok(llm_resp)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use nanox_core::types::ToolCall;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_provider(api_base: &str) -> HttpProvider {
        HttpProvider::new(
            api_base,
            "test-key-123",
            "moonshot-v1-8k",
            Duration::from_secs(5),
            OverflowPolicy::default(),
        )
    }

    // ── Unit tests ──

    #[test]
    fn test_completions_url_trailing_slash() {
        let provider = make_provider("https://api.moonshot.cn/v1/");
        assert_eq!(
            provider.completions_url(),
            "https://api.moonshot.cn/v1/chat/completions"
        );
    }

    #[test]
    fn test_completions_url_no_trailing_slash() {
        let provider = make_provider("https://api.moonshot.cn/v1");
        assert_eq!(
            provider.completions_url(),
            "https://api.moonshot.cn/v1/chat/completions"
        );
    }

    #[test]
    fn test_from_config() {
        let mut provider_cfg = ProviderConfig::default();
        provider_cfg.api_base = "http://localhost:8000/v1".into();
        provider_cfg.api_key = "k".into();
        let provider = HttpProvider::from_config(&provider_cfg, &SelfHealConfig::default());
        assert_eq!(provider.default_model(), "moonshot-v1-8k");
        assert_eq!(provider.policy, OverflowPolicy::default());
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_chat_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-test",
                "choices": [{
                    "message": {
                        "content": "Hello! I'm nanox.",
                        "tool_calls": null
                    },
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": 10,
                    "completion_tokens": 5,
                    "total_tokens": 15
                }
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let messages = vec![Message::system("You are nanox."), Message::user("Hello")];

        let resp = provider
            .chat(&messages, None, "moonshot-v1-8k", &LlmRequestConfig::default())
            .await
            .unwrap();

        assert_eq!(resp.content.as_deref(), Some("Hello! I'm nanox."));
        assert!(!resp.has_tool_calls());
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.as_ref().unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_chat_with_tool_calls() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"tool_choice": "auto"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-tools",
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_abc123",
                            "type": "function",
                            "function": {
                                "name": "web_search",
                                "arguments": "{\"query\": \"Rust programming\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": null
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let tool_def = ToolDefinition::new(
            "web_search",
            "Search the web",
            serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        );
        let messages = vec![Message::user("Search for Rust")];

        let resp = provider
            .chat(&messages, Some(&[tool_def]), "moonshot-v1-8k", &LlmRequestConfig::default())
            .await
            .unwrap();

        assert!(resp.content.is_none());
        assert_eq!(
            resp.tool_calls,
            vec![ToolCall::new(
                "call_abc123",
                "web_search",
                "{\"query\": \"Rust programming\"}"
            )]
        );
    }

    #[tokio::test]
    async fn test_chat_context_overflow() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "message": "This model's maximum context length is 8192 tokens",
                    "code": "context_length_exceeded"
                }
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let err = provider
            .chat(&[Message::user("hi")], None, "moonshot-v1-8k", &LlmRequestConfig::default())
            .await
            .unwrap_err();

        assert!(err.is_context_overflow());
        assert_eq!(err.status, Some(400));
    }

    #[tokio::test]
    async fn test_chat_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {
                    "message": "Rate limit exceeded",
                    "type": "rate_limit_error"
                }
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let err = provider
            .chat(&[Message::user("Hello")], None, "moonshot-v1-8k", &LlmRequestConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::RateLimit);
        assert!(!err.is_context_overflow());
        assert!(err.message.contains("Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_chat_empty_choices_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "x",
                "choices": [],
                "usage": null
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let err = provider
            .chat(&[Message::user("Hello")], None, "moonshot-v1-8k", &LlmRequestConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_chat_network_error() {
        // Point to a port that's not listening
        let provider = make_provider("http://127.0.0.1:1");
        let err = provider
            .chat(&[Message::user("Hello")], None, "moonshot-v1-8k", &LlmRequestConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind,
            ProviderErrorKind::Network | ProviderErrorKind::Timeout
        ));
    }

    #[tokio::test]
    async fn test_chat_sends_correct_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "kimi-k2",
                "max_tokens": 4096,
                "temperature": 0.7
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-body",
                "choices": [{
                    "message": { "content": "ok" },
                    "finish_reason": "stop"
                }],
                "usage": null
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let resp = provider
            .chat(&[Message::user("test")], None, "kimi-k2", &LlmRequestConfig::default())
            .await
            .unwrap();

        // If the body matcher fails, wiremock returns 404 → we'd get an error
        assert_eq!(resp.content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_chat_with_reasoning_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-reasoning",
                "choices": [{
                    "message": {
                        "content": "The answer is 42.",
                        "reasoning_content": "Let me think step by step..."
                    },
                    "finish_reason": "stop"
                }],
                "usage": null
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let resp = provider
            .chat(&[Message::user("Why?")], None, "kimi-k2", &LlmRequestConfig::default())
            .await
            .unwrap();

        assert_eq!(resp.content.as_deref(), Some("The answer is 42."));
        assert_eq!(
            resp.reasoning_content.as_deref(),
            Some("Let me think step by step...")
        );
    }
}
