use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::{ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse, LlmClient, OpenAiError, UsageMetrics};

// DeepSeek speaks the OpenAI chat-completions protocol
const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_TOP_P: f32 = 1.0;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub default_top_p: f32,
    pub timeout: Duration,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
            default_top_p: DEFAULT_TOP_P,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OpenAiClientConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.api_key = env_str("OPENAI_API_KEY").or_else(|| env_str("DEEPSEEK_API_KEY"));
        if let Some(base) = env_str("OPENAI_BASE_URL") { cfg.base_url = base; }
        if let Some(model) = env_str("OPENAI_MODEL") { cfg.default_model = model; }
        if let Some(t) = env_parse::<f32>("OPENAI_TEMPERATURE") { cfg.default_temperature = t; }
        if let Some(p) = env_parse::<f32>("OPENAI_TOP_P") { cfg.default_top_p = p; }
        if let Some(secs) = env_parse::<u64>("OPENAI_TIMEOUT_SECS") { cfg.timeout = Duration::from_secs(secs); }
        cfg
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|v| v.trim().parse().ok())
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: HttpClient,
    cfg: OpenAiClientConfig,
}

impl OpenAiClient {
    pub fn new(cfg: OpenAiClientConfig) -> Result<Self, OpenAiError> {
        let http = HttpClient::builder().timeout(cfg.timeout).build().map_err(OpenAiError::from_reqwest)?;
        Ok(Self { http, cfg })
    }

    pub fn model(&self) -> &str { &self.cfg.default_model }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }

    fn build_api_request(&self, req: &ChatCompletionRequest) -> ApiChatCompletionRequest {
        ApiChatCompletionRequest {
            model: req.model.clone().unwrap_or_else(|| self.cfg.default_model.clone()),
            temperature: req.temperature.unwrap_or(self.cfg.default_temperature),
            top_p: req.top_p.unwrap_or(self.cfg.default_top_p),
            max_tokens: req.max_tokens,
            messages: req
                .messages
                .iter()
                .map(|m| ApiChatMessage { role: m.role.as_api_str().to_string(), content: Some(m.content.clone()) })
                .collect(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, OpenAiError> {
        if request.messages.is_empty() {
            return Err(OpenAiError::EmptyMessages);
        }
        let api_key = self.cfg.api_key.as_deref().ok_or(OpenAiError::MissingApiKey)?;
        let body = self.build_api_request(&request);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(OpenAiError::from_reqwest)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(OpenAiError::from_reqwest)?;

        if !status.is_success() {
            let error = serde_json::from_slice::<ApiErrorEnvelope>(&bytes).map(|env| env.error).unwrap_or_default();
            return Err(OpenAiError::Api { status, error });
        }
        decode_response(&bytes)
    }
}

fn decode_response(bytes: &[u8]) -> Result<ChatCompletionResponse, OpenAiError> {
    let parsed: ApiChatCompletionResponse = serde_json::from_slice(bytes)?;
    let content = parsed
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(OpenAiError::EmptyResponse);
    }
    Ok(ChatCompletionResponse {
        content,
        usage: parsed.usage.map(|u| UsageMetrics {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize)]
struct ApiChatCompletionRequest {
    model: String,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<ApiChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatCompletionResponse {
    choices: Vec<ApiChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatChoice {
    message: ApiChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}
