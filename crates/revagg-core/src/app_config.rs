use std::str::FromStr;

use crate::{CoreError, TimePeriod};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which chat-completion backend the analysis client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Groq,
    Ollama,
}

impl LlmProvider {
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::Groq => "https://api.groq.com/openai/v1",
            LlmProvider::Ollama => "http://localhost:11434",
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Groq => "llama-3.3-70b-versatile",
            LlmProvider::Ollama => "deepseek-r1",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Groq => write!(f, "groq"),
            LlmProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(LlmProvider::Groq),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(CoreError::InvalidLlmProvider(other.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub llm_provider: LlmProvider,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_request_timeout_secs: u64,
    pub llm_max_concurrent: usize,
    pub llm_min_interval_ms: u64,
    pub llm_max_retries: u32,
    pub llm_retry_backoff_base_ms: u64,
    pub stats_time_periods: Vec<TimePeriod>,
    pub stats_max_concurrent_units: usize,
    pub stats_max_concurrent_products: usize,
    pub stats_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("llm_provider", &self.llm_provider)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_request_timeout_secs", &self.llm_request_timeout_secs)
            .field("llm_max_concurrent", &self.llm_max_concurrent)
            .field("llm_min_interval_ms", &self.llm_min_interval_ms)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("llm_retry_backoff_base_ms", &self.llm_retry_backoff_base_ms)
            .field("stats_time_periods", &self.stats_time_periods)
            .field(
                "stats_max_concurrent_units",
                &self.stats_max_concurrent_units,
            )
            .field(
                "stats_max_concurrent_products",
                &self.stats_max_concurrent_products,
            )
            .field("stats_cron", &self.stats_cron)
            .finish()
    }
}
