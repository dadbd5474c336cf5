//! HTTP client for chat-completion providers.
//!
//! Groq is addressed through its OpenAI-compatible `/chat/completions`
//! endpoint; Ollama through its native `/api/chat`. Both are called
//! non-streaming and the assistant message text is returned verbatim.

use std::time::{Duration, Instant};

use reqwest::{header, Client, StatusCode};
use revagg_core::{AppConfig, LlmProvider};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::gate::CallGate;
use crate::retry::retry_with_backoff;
use crate::types::{Prompt, ResponseShape};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TEMPERATURE: f32 = 1.0;
const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 1024;
const ERROR_BODY_LIMIT: usize = 500;

/// Connection and behaviour settings for [`LlmClient`].
#[derive(Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub max_concurrent: usize,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_concurrent", &self.max_concurrent)
            .field("min_interval_ms", &self.min_interval_ms)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl LlmConfig {
    /// Provider defaults: default base URL and model, 3 retries, 2 concurrent calls.
    #[must_use]
    pub fn new(provider: LlmProvider) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            max_concurrent: 2,
            min_interval_ms: 0,
            max_retries: 3,
            retry_backoff_base_ms: 1_000,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            provider: config.llm_provider,
            base_url: config.llm_base_url.clone(),
            model: config.llm_model.clone(),
            api_key: config.llm_api_key.clone(),
            timeout_secs: config.llm_request_timeout_secs,
            temperature: DEFAULT_TEMPERATURE,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            max_concurrent: config.llm_max_concurrent,
            min_interval_ms: config.llm_min_interval_ms,
            max_retries: config.llm_max_retries,
            retry_backoff_base_ms: config.llm_retry_backoff_base_ms,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_completion_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct GroqResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: ResponseMessage,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat-completion client shared by every analysis unit of a process.
///
/// Cheap to share behind an `Arc`; the [`CallGate`] inside bounds how many
/// requests are in flight across all callers.
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    endpoint: String,
    gate: CallGate,
}

impl LlmClient {
    /// Builds a client for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when the provider is Groq and no
    /// key is configured, or [`LlmError::Http`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.provider == LlmProvider::Groq
            && config.api_key.as_deref().is_none_or(str::is_empty)
        {
            return Err(LlmError::MissingApiKey("GROQ_API_KEY"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("revagg/0.1 (review-analytics)")
            .build()?;

        let base = config.base_url.trim_end_matches('/');
        let endpoint = match config.provider {
            LlmProvider::Groq => format!("{base}/chat/completions"),
            LlmProvider::Ollama => format!("{base}/api/chat"),
        };
        let gate = CallGate::new(
            config.max_concurrent,
            Duration::from_millis(config.min_interval_ms),
        );

        Ok(Self {
            client,
            config,
            endpoint,
            gate,
        })
    }

    /// Sends `prompt` and returns the assistant's raw text.
    ///
    /// Each attempt waits on the call gate; transient failures are retried
    /// with back-off. The text is not parsed here.
    ///
    /// # Errors
    ///
    /// - [`LlmError::RateLimited`] / [`LlmError::UnexpectedStatus`] when the
    ///   provider keeps refusing after all retries.
    /// - [`LlmError::Http`] on network failure.
    /// - [`LlmError::EmptyResponse`] when the completion has no text.
    /// - [`LlmError::Deserialize`] when the envelope has an unexpected shape.
    pub async fn complete(&self, prompt: &Prompt, shape: ResponseShape) -> Result<String, LlmError> {
        retry_with_backoff(
            self.config.max_retries,
            self.config.retry_backoff_base_ms,
            move || async move {
                let _permit = self.gate.acquire().await?;
                self.send_once(prompt, shape).await
            },
        )
        .await
    }

    async fn send_once(&self, prompt: &Prompt, shape: ResponseShape) -> Result<String, LlmError> {
        let messages = [
            ChatMessage {
                role: "system",
                content: &prompt.system,
            },
            ChatMessage {
                role: "user",
                content: &prompt.user,
            },
        ];

        let request = match self.config.provider {
            LlmProvider::Groq => {
                let body = GroqRequest {
                    model: &self.config.model,
                    messages,
                    temperature: self.config.temperature,
                    max_completion_tokens: self.config.max_completion_tokens,
                    stream: false,
                    // JSON mode only accepts object roots.
                    response_format: (shape == ResponseShape::Object).then_some(ResponseFormat {
                        kind: "json_object",
                    }),
                };
                let mut builder = self.client.post(&self.endpoint).json(&body);
                if let Some(key) = &self.config.api_key {
                    builder = builder.bearer_auth(key);
                }
                builder
            }
            LlmProvider::Ollama => {
                let body = OllamaRequest {
                    model: &self.config.model,
                    messages,
                    stream: false,
                    format: "json",
                };
                self.client.post(&self.endpoint).json(&body)
            }
        };

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::UnexpectedStatus {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let body = response.text().await?;
        let content = match self.config.provider {
            LlmProvider::Groq => {
                let envelope: GroqResponse =
                    serde_json::from_str(&body).map_err(|e| LlmError::Deserialize {
                        context: "groq chat completion".to_string(),
                        source: e,
                    })?;
                envelope
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
            }
            LlmProvider::Ollama => {
                let envelope: OllamaResponse =
                    serde_json::from_str(&body).map_err(|e| LlmError::Deserialize {
                        context: "ollama chat".to_string(),
                        source: e,
                    })?;
                envelope.message.content
            }
        };

        let content = content
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        tracing::debug!(
            provider = %self.config.provider,
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis(),
            chars = content.len(),
            "LLM completion received"
        );

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groq_without_key_is_rejected() {
        let result = LlmClient::new(LlmConfig::new(LlmProvider::Groq));
        assert!(matches!(result, Err(LlmError::MissingApiKey("GROQ_API_KEY"))));
    }

    #[test]
    fn groq_with_blank_key_is_rejected() {
        let result = LlmClient::new(LlmConfig::new(LlmProvider::Groq).with_api_key(""));
        assert!(matches!(result, Err(LlmError::MissingApiKey(_))));
    }

    #[test]
    fn endpoint_follows_provider() {
        let groq = LlmClient::new(
            LlmConfig::new(LlmProvider::Groq)
                .with_api_key("k")
                .with_base_url("https://api.groq.com/openai/v1/"),
        )
        .unwrap();
        assert_eq!(
            groq.endpoint,
            "https://api.groq.com/openai/v1/chat/completions"
        );

        let ollama = LlmClient::new(LlmConfig::new(LlmProvider::Ollama)).unwrap();
        assert_eq!(ollama.endpoint, "http://localhost:11434/api/chat");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = LlmConfig::new(LlmProvider::Groq).with_api_key("gsk_secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
