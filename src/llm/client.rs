//! HTTP providers for hosted and local language models
//!
//! Supports both Anthropic and OpenAI-compatible APIs (OpenAI, Gemini's
//! compatibility endpoint, DeepSeek, Ollama). Transport and HTTP status
//! failures are classified into `ErrorKind`s so the orchestrator can fail
//! over uniformly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::core::config::{ApiFormat, ProviderEndpoint};
use crate::llm::parser::COMMAND_SYSTEM_PROMPT;
use crate::llm::provider::{CommandRequest, ErrorKind, Provider, ProviderError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 4096;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A provider reached over HTTP
pub struct HttpProvider {
    id: String,
    client: Client,
    api_key: Option<String>,
    /// Local servers such as Ollama accept requests without a key
    requires_key: bool,
    api_url: String,
    model: String,
    format: ApiFormat,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("id", &self.id)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("format", &self.format)
            .field("has_key", &self.api_key.is_some())
            .finish()
    }
}

impl HttpProvider {
    pub fn new(
        id: impl Into<String>,
        api_key: Option<String>,
        requires_key: bool,
        api_url: impl Into<String>,
        model: impl Into<String>,
        format: ApiFormat,
    ) -> Result<Self, ProviderError> {
        let id = id.into();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to build HTTP client: {}", e))
                    .with_provider(id.clone())
                    .with_source(e)
            })?;

        Ok(Self {
            id,
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            requires_key,
            api_url: api_url.into(),
            model: model.into(),
            format,
        })
    }

    /// Provider for a configured endpoint, reading its key from the environment
    ///
    /// A missing key is not an error here; the provider just reports itself
    /// unavailable.
    pub fn from_endpoint(endpoint: &ProviderEndpoint) -> Result<Self, ProviderError> {
        let api_key = endpoint
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());

        Self::new(
            endpoint.id.clone(),
            api_key,
            endpoint.api_key_env.is_some(),
            endpoint.api_url.clone(),
            endpoint.model.clone(),
            endpoint.format,
        )
    }

    /// Detect API format from URL
    pub fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    /// Single ad-hoc provider from environment variables
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (defaults to Anthropic API)
    /// Optional: LLM_MODEL (defaults to claude-3-haiku-20240307)
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ProviderError::configuration("LLM_API_KEY not set"))?;
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into());
        let model =
            std::env::var("LLM_MODEL").unwrap_or_else(|_| "claude-3-haiku-20240307".into());
        let format = Self::detect_api_format(&api_url);

        Self::new("env", Some(api_key), true, api_url, model, format)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn format(&self) -> ApiFormat {
        self.format
    }

    /// Send a completion request and return the reply text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let result = match self.format {
            ApiFormat::Anthropic => self.complete_anthropic(system, user).await,
            ApiFormat::OpenAI => self.complete_openai(system, user).await,
        };
        result.map_err(|e| e.with_provider(self.id.clone()))
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let mut builder = self
            .client
            .post(&self.api_url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.json(&request).send().await.map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let completion: AnthropicResponse = response.json().await.map_err(classify_transport)?;
        completion
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ProviderError::invalid_response("empty response"))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let mut builder = self
            .client
            .post(&self.api_url)
            .header("content-type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.json(&request).send().await.map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let completion: OpenAIResponse = response.json().await.map_err(classify_transport)?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::invalid_response("empty response"))
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_available(&self) -> bool {
        !self.requires_key || self.api_key.is_some()
    }

    async fn execute(&self, request: &CommandRequest) -> Result<String, ProviderError> {
        tracing::debug!(
            provider = %self.id,
            model = %self.model,
            request_id = %request.id,
            "Sending command"
        );
        self.complete(COMMAND_SYSTEM_PROMPT, &request.user_prompt()).await
    }
}

/// Map a non-success HTTP status to an error kind
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Authentication,
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimit,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ErrorKind::Timeout,
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => ErrorKind::Configuration,
        s if s.is_server_error() => ErrorKind::ServiceUnavailable,
        _ => ErrorKind::Unknown,
    };
    ProviderError::new(kind, format!("API error {}: {}", status.as_u16(), body))
}

fn classify_transport(e: reqwest::Error) -> ProviderError {
    let kind = if e.is_timeout() {
        ErrorKind::Timeout
    } else if e.is_connect() || e.is_request() {
        ErrorKind::Network
    } else if e.is_decode() || e.is_body() {
        ErrorKind::InvalidResponse
    } else {
        ErrorKind::Unknown
    };
    ProviderError::new(kind, e.to_string()).with_source(e)
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(api_key_env: Option<&str>) -> ProviderEndpoint {
        ProviderEndpoint {
            id: "local".into(),
            api_url: "http://localhost:11434/v1/chat/completions".into(),
            model: "llama3".into(),
            api_key_env: api_key_env.map(String::from),
            format: ApiFormat::OpenAI,
        }
    }

    #[test]
    fn test_keyless_endpoint_is_available() {
        let provider = HttpProvider::from_endpoint(&endpoint(None)).unwrap();
        assert!(provider.is_available());
        assert_eq!(provider.id(), "local");
        assert!(!provider.supports_streaming());
    }

    #[test]
    fn test_missing_key_makes_provider_unavailable() {
        let provider =
            HttpProvider::from_endpoint(&endpoint(Some("GALAXY_INTENT_TEST_UNSET_KEY"))).unwrap();
        assert!(!provider.is_available());
    }

    #[test]
    fn test_blank_key_is_ignored() {
        let provider = HttpProvider::new(
            "openai",
            Some("  ".into()),
            true,
            "https://api.openai.com/v1/chat/completions",
            "gpt-4o-mini",
            ApiFormat::OpenAI,
        )
        .unwrap();
        assert!(!provider.is_available());
    }

    #[test]
    fn test_detect_api_format() {
        assert_eq!(
            HttpProvider::detect_api_format("https://api.anthropic.com/v1/messages"),
            ApiFormat::Anthropic
        );
        assert_eq!(
            HttpProvider::detect_api_format("https://api.deepseek.com/chat/completions"),
            ApiFormat::OpenAI
        );
    }

    #[test]
    fn test_classify_status() {
        let kind = |code: u16| classify_status(StatusCode::from_u16(code).unwrap(), "").kind;
        assert_eq!(kind(401), ErrorKind::Authentication);
        assert_eq!(kind(403), ErrorKind::Authentication);
        assert_eq!(kind(429), ErrorKind::RateLimit);
        assert_eq!(kind(500), ErrorKind::ServiceUnavailable);
        assert_eq!(kind(503), ErrorKind::ServiceUnavailable);
        assert_eq!(kind(504), ErrorKind::Timeout);
        assert_eq!(kind(404), ErrorKind::Configuration);
        assert_eq!(kind(418), ErrorKind::Unknown);
    }

    #[test]
    fn test_status_detail_keeps_body() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.detail, "API error 429: slow down");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let provider = HttpProvider::new(
            "dead",
            None,
            false,
            "http://127.0.0.1:9/v1/chat/completions",
            "none",
            ApiFormat::OpenAI,
        )
        .unwrap();
        let err = provider.complete("system", "user").await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Network | ErrorKind::Timeout));
        assert_eq!(err.provider.as_deref(), Some("dead"));
    }
}
