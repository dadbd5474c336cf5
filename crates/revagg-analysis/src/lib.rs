//! Chat-completion client used to analyze product reviews.
//!
//! [`LlmClient`] speaks to either Groq (OpenAI-compatible) or a local Ollama
//! server. Every call passes through a [`CallGate`] that bounds concurrency
//! and spaces out call starts, and transient failures are retried with
//! exponential back-off.

mod client;
mod error;
mod gate;
mod retry;
mod types;

pub use client::{LlmClient, LlmConfig};
pub use error::LlmError;
pub use gate::CallGate;
pub use types::{Prompt, ResponseShape};
