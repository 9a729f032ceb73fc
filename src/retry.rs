//! Fixed-backoff retry policy shared by the external service clients.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

/// Classifies an error as transient (worth another attempt) or terminal.
pub trait Retryable {
    /// Whether a fresh attempt could plausibly succeed.
    fn is_retryable(&self) -> bool;
}

/// Bounded retry schedule with a constant delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: usize,
    /// Delay between attempts, also used as the rate-limit cooldown.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Build a policy with an explicit attempt budget and backoff.
    pub const fn new(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Three attempts, five seconds apart.
    pub const fn summarization() -> Self {
        Self::new(3, Duration::from_secs(5))
    }

    /// A single attempt; the backoff doubles as the two-minute rate-limit cooldown.
    pub const fn search() -> Self {
        Self::new(1, Duration::from_secs(120))
    }

    /// Run `operation` until it succeeds, fails terminally, or the attempt budget runs out.
    ///
    /// The last error is returned when every attempt fails.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let delays = FixedInterval::new(self.backoff).take(self.max_attempts.saturating_sub(1));
        RetryIf::spawn(delays, operation, |error: &E| {
            let retry = error.is_retryable();
            if retry {
                tracing::debug!(
                    %error,
                    backoff_ms = self.backoff.as_millis() as u64,
                    "Retrying after transient failure"
                );
            }
            retry
        })
        .await
    }

    /// Sleep for the configured backoff.
    pub async fn cooldown(&self) {
        tokio::time::sleep(self.backoff).await;
    }
}
