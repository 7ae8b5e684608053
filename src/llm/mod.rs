//! Chat-completion seam used by the summarizer.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod openai;
#[cfg(test)]
pub mod mock;

pub use openai::{OpenAiClient, OpenAiClientConfig};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, OpenAiError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl ChatCompletionRequest {
    /// System instruction plus one user body, everything else defaulted.
    pub fn instructed(instruction: &str, body: &str) -> Self {
        Self {
            model: None,
            messages: vec![ChatMessage::new(ChatRole::System, instruction), ChatMessage::new(ChatRole::User, body)],
            max_tokens: None,
            temperature: None,
            top_p: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChatRole {
    System,
    User,
}

impl ChatRole {
    pub(crate) fn as_api_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionResponse {
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

#[cfg(test)]
impl ChatCompletionResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), usage: None }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UsageMetrics {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("no API key (set OPENAI_API_KEY or DEEPSEEK_API_KEY)")]
    MissingApiKey,
    #[error("chat completion requires at least one message")]
    EmptyMessages,
    #[error("model returned an empty completion")]
    EmptyResponse,
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("api error {status}: {}", .error.message)]
    Api { status: StatusCode, error: ApiErrorBody },
    #[cfg(test)]
    #[error("mock client response queue is empty")]
    MockQueueEmpty,
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl OpenAiError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { OpenAiError::Timeout } else { OpenAiError::Http(err) }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            OpenAiError::Timeout | OpenAiError::Http(_) => true,
            OpenAiError::Api { status, .. } => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl Default for ApiErrorBody {
    fn default() -> Self {
        Self { message: "unknown error".to_string(), r#type: None, code: None }
    }
}
