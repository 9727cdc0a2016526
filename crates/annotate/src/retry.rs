use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::RetryConfig;

/// Capped exponential backoff for model calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    /// Run `f` until it succeeds or `max_retries` retries have failed.
    ///
    /// Each wait is drawn from the upper half of the current backoff, which
    /// doubles up to `max_backoff`. The final error records how many
    /// attempts were made.
    pub async fn retry<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempts = attempt, "Recovered after retrying");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if attempt > self.max_retries {
                warn!(operation, attempts = attempt, error = %error, "Giving up");
                return Err(error.context(format!("{operation} failed after {attempt} attempts")));
            }

            let delay = jittered(backoff);
            warn!(
                operation,
                attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, backing off"
            );
            sleep(delay).await;
            backoff = (backoff * 2).min(self.max_backoff);
        }
    }
}

fn jittered(backoff: Duration) -> Duration {
    let half = backoff / 2;
    half + half.mul_f64(rand::random::<f64>())
}
