//! Retry with exponential back-off and jitter for LLM calls.
//!
//! [`retry_with_backoff`] wraps a fallible async call and retries on
//! transient errors (rate limits, network failures, 5xx). Client-side
//! errors and malformed envelopes are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** rate limits, timeouts, connection failures, HTTP 5xx.
///
/// **Not retriable:** other 4xx statuses, empty completions, undecodable
/// envelopes, a missing API key, a closed gate.
pub(crate) fn is_retriable(err: &LlmError) -> bool {
    match err {
        LlmError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        LlmError::RateLimited { .. } => true,
        LlmError::UnexpectedStatus { status, .. } => *status >= 500,
        LlmError::EmptyResponse
        | LlmError::Deserialize { .. }
        | LlmError::MissingApiKey(_)
        | LlmError::GateClosed => false,
    }
}

/// Back-off before retry number `attempt` (1-based), before jitter.
///
/// A provider-supplied `Retry-After` raises the delay but never past the cap.
fn base_delay_ms(backoff_base_ms: u64, attempt: u32, err: &LlmError) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let hinted = match err {
        LlmError::RateLimited {
            retry_after_secs: Some(secs),
        } => computed.max(secs.saturating_mul(1_000)),
        _ => computed,
    };
    hinted.min(MAX_DELAY_MS)
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Attempt | Sleep before next attempt        |
/// |---------|----------------------------------|
/// | 1       | 1 000 ms × 2⁰ ± 25 % jitter     |
/// | 2       | 1 000 ms × 2¹ ± 25 % jitter     |
/// | 3       | 1 000 ms × 2² ± 25 % jitter     |
///
/// Delay is capped at 60 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = base_delay_ms(backoff_base_ms, attempt, &err);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "LLM transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
