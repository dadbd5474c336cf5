use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid time period: {0}")]
    InvalidTimePeriod(String),

    #[error("invalid LLM provider: {0}")]
    InvalidLlmProvider(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
