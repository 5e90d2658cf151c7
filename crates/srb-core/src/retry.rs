use std::{future::Future, time::Duration};

use tokio::time::sleep;

/// Bounded exponential backoff: the delay doubles after each failed attempt,
/// capped at `max_delay`. After `max_attempts` failures the last error is
/// returned to the caller.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Startup path (runs once, blocking longer is acceptable).
    pub fn startup() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Steady-state path (runs per message, must not stall the event loop).
    pub fn steady() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Run `op`, retrying while `retryable` says the error is transient.
    ///
    /// Non-retryable errors and the final exhausted attempt fail immediately.
    pub async fn run<T, E, F, Fut>(
        &self,
        retryable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, retrying: {e}"
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
