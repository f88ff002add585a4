use anyhow::Result;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential,
}

impl FromStr for Backoff {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "exponential" | "exp" => Ok(Backoff::Exponential),
            other => anyhow::bail!("Unknown retry backoff: {}", other),
        }
    }
}

/// How many times a remote call is attempted and how long to wait in between.
///
/// One policy is shared by the summarizer and the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    pub fn new(max_attempts: usize, delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff,
        }
    }

    /// Waits between attempts; always `max_attempts - 1` long.
    pub fn delays(&self) -> Vec<Duration> {
        let retries = self.max_attempts.saturating_sub(1);
        match self.backoff {
            Backoff::Fixed => FixedInterval::new(self.delay).take(retries).collect(),
            Backoff::Exponential => (0..retries)
                .map(|n| self.delay.saturating_mul(2u32.saturating_pow(n as u32)))
                .collect(),
        }
    }

    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts;
        let mut attempt = 0usize;

        Retry::start(self.delays(), || {
            attempt += 1;
            let current = attempt;
            let call = operation();
            async move {
                call.await.map_err(|e| {
                    warn!(
                        "{} failed (attempt {}/{}): {:#}",
                        label, current, max_attempts, e
                    );
                    e
                })
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fixed_delays_repeat() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5), Backoff::Fixed);
        assert_eq!(
            policy.delays(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[test]
    fn exponential_delays_double() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), Backoff::Exponential);
        assert_eq!(
            policy.delays(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1), Backoff::Fixed);
        assert_eq!(policy.max_attempts, 1);
        assert!(policy.delays().is_empty());
    }

    #[test]
    fn backoff_parses_loosely() {
        assert_eq!("Fixed".parse::<Backoff>().unwrap(), Backoff::Fixed);
        assert_eq!("exp".parse::<Backoff>().unwrap(), Backoff::Exponential);
        assert!("linear".parse::<Backoff>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Duration::from_secs(5), Backoff::Fixed);
        let start = tokio::time::Instant::now();

        let result = policy
            .run("flaky", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("rate limited")
                }
                Ok("done")
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::from_secs(1), Backoff::Fixed);

        let result: Result<()> = policy
            .run("broken", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("still broken")
            })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "still broken");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn single_attempt_does_not_retry() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<()> = RetryPolicy::once()
            .run("once", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("nope")
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
