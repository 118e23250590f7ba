//! Backend abstraction for language-model providers
//!
//! A provider turns a `CommandRequest` into raw reply text. Failures are
//! reported as a `ProviderError` whose kind has a fixed user-facing message;
//! the technical detail travels alongside for logs.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Failure classes shared by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Network,
    Authentication,
    RateLimit,
    InvalidResponse,
    ServiceUnavailable,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::InvalidResponse => "invalid_response",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Message safe to show an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration => {
                "The AI provider is not configured. Check your provider settings."
            }
            Self::Network => "Could not reach the AI provider. Check your network connection.",
            Self::Authentication => "The AI provider rejected the credentials. Check your API key.",
            Self::RateLimit => "The AI provider is limiting requests. Wait a moment and try again.",
            Self::InvalidResponse => "The AI provider returned a reply that could not be understood.",
            Self::ServiceUnavailable => "No AI provider is available right now. Try again later.",
            Self::Timeout => "The AI provider took too long to respond.",
            Self::Unknown => "Something went wrong while contacting the AI provider.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified backend failure
#[derive(Debug, Error)]
#[error("{kind} error{}: {detail}", provider_suffix(.provider))]
pub struct ProviderError {
    pub kind: ErrorKind,
    /// Technical description, not for end users
    pub detail: String,
    pub provider: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn provider_suffix(provider: &Option<String>) -> String {
    provider
        .as_ref()
        .map(|p| format!(" from {}", p))
        .unwrap_or_default()
}

impl ProviderError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            provider: None,
            source: None,
        }
    }

    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, detail)
    }

    pub fn invalid_response(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, detail)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, detail)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

/// One command bound for a backend
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub id: Uuid,
    pub command: String,
    /// Serialized scene projection shared with the projection cache
    pub context: Arc<Value>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>, context: Arc<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            command: command.into(),
            context,
        }
    }

    /// User turn sent alongside the system prompt
    pub fn user_prompt(&self) -> String {
        format!(
            "SCENE:\n{}\n\nCOMMAND:\n{}\n\nRespond with JSON only:",
            self.context, self.command
        )
    }
}

/// Receives partial reply text while a streaming call is in flight
pub type ChunkSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// A language-model backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry key, also used in the fallback order
    fn id(&self) -> &str;

    /// Whether the backend can be called right now (credentials present, etc.)
    ///
    /// Must not perform I/O.
    fn is_available(&self) -> bool;

    fn supports_streaming(&self) -> bool {
        false
    }

    /// Full reply text for `request`
    async fn execute(&self, request: &CommandRequest) -> Result<String, ProviderError>;

    /// Same as `execute`, forwarding partial text to `on_chunk` as it arrives
    async fn execute_streaming(
        &self,
        request: &CommandRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, ProviderError> {
        let _ = (request, on_chunk);
        Err(ProviderError::configuration("streaming is not supported").with_provider(self.id()))
    }
}
