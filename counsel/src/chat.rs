use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

/// Groq's OpenAI-compatible chat completions endpoint.
pub const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.2-90b-vision-preview";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a completion request produced no text.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("no response from the model within {0:?}")]
    Timeout(Duration),
    #[error("model API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("error communicating with the model API: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected model API response: {0}")]
    Malformed(String),
}

/// Anything that can answer a single prompt with text.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Send `prompt` as one user message and return the reply, trimmed.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Connection settings for [`ChatClient`].
#[derive(Clone)]
pub struct ChatConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ChatConfig {
    /// Groq defaults with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: GROQ_CHAT_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [UserMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Single-shot client for an OpenAI-compatible chat completions API.
///
/// Every call is one HTTP request bounded by the configured timeout; there
/// are no retries.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(CompletionError::Transport)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn failed(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.config.timeout)
        } else if e.is_decode() {
            CompletionError::Malformed(e.to_string())
        } else {
            CompletionError::Transport(e)
        }
    }
}

#[async_trait]
impl Completion for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [UserMessage {
                role: "user",
                content: [TextPart {
                    kind: "text",
                    text: prompt,
                }],
            }],
            max_tokens: self.config.max_tokens,
        };
        trace!(target: "llm", url = %self.config.url, %prompt, "chat prompt");
        let resp = self
            .http
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.failed(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(target: "llm", %status, %body, "model API error");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| self.failed(e))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::Malformed("response has no choices".into()))?;
        let text = text.trim().to_string();
        debug!(target: "llm", response = %text, "chat response");
        Ok(text)
    }
}
