//! Concurrency and pacing limiter placed in front of every LLM call.

use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

use crate::error::LlmError;

/// Bounds in-flight calls to `max_concurrent` and keeps at least
/// `min_interval` between consecutive call starts.
#[derive(Debug)]
pub struct CallGate {
    permits: Semaphore,
    min_interval: Duration,
    next_start: Mutex<Instant>,
}

impl CallGate {
    /// `max_concurrent` is clamped to at least 1.
    #[must_use]
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            permits: Semaphore::new(max_concurrent.max(1)),
            min_interval,
            next_start: Mutex::new(Instant::now()),
        }
    }

    /// Waits for a free slot and for the pacing interval to elapse.
    ///
    /// The returned permit must be held for the duration of the call.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::GateClosed`] if the underlying semaphore was closed.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, LlmError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LlmError::GateClosed)?;

        if !self.min_interval.is_zero() {
            let mut next_start = self.next_start.lock().await;
            let now = Instant::now();
            if *next_start > now {
                tokio::time::sleep_until(*next_start).await;
            }
            *next_start = Instant::now() + self.min_interval;
        }

        Ok(permit)
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn never_exceeds_max_concurrent() {
        let gate = Arc::new(CallGate::new(2, Duration::ZERO));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = Arc::clone(&gate);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test]
    async fn spaces_out_call_starts() {
        let gate = CallGate::new(4, Duration::from_millis(40));
        let started = Instant::now();
        for _ in 0..3 {
            let _permit = gate.acquire().await.unwrap();
        }
        // first call starts immediately, the next two wait one interval each
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(CallGate::new(0, Duration::ZERO).available(), 1);
    }
}
