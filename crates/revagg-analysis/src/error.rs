use thiserror::Error;

/// Errors returned by the chat-completion client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered `429 Too Many Requests`.
    #[error("rate limited by LLM provider (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-2xx answer.
    #[error("LLM provider returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The completion carried no text.
    #[error("LLM provider returned an empty completion")]
    EmptyResponse,

    /// The response envelope could not be deserialized.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} is required for the configured LLM provider")]
    MissingApiKey(&'static str),

    #[error("LLM call gate is closed")]
    GateClosed,
}
