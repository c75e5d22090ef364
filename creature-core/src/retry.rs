//! Retry with exponential backoff for generation calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How failed generation calls are retried.
///
/// The default makes one attempt plus two retries, waiting 1000ms and then
/// 1500ms. After the last retry the final error is returned unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Factor applied to the wait after each retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(1000),
            multiplier: 1.5,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Retries without waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// The waits between attempts, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut next = self.initial_delay;
        (0..self.max_retries).map(move |_| {
            let current = next;
            next = Duration::from_secs_f64(next.as_secs_f64() * self.multiplier);
            current
        })
    }

    /// Run `op` until it succeeds or the retries are used up.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut delays = self.delays();
        let mut attempts_left = self.max_retries;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let Some(delay) = delays.next() else {
                        return Err(error);
                    };
                    warn!(
                        operation,
                        attempts_left,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "generation call failed, retrying"
                    );
                    attempts_left -= 1;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_delays() {
        let delays: Vec<_> = RetryPolicy::default().delays().collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(1000), Duration::from_millis(1500)]
        );
    }

    #[test]
    fn test_no_retry_has_no_delays() {
        assert_eq!(RetryPolicy::no_retry().delays().count(), 0);
    }

    #[tokio::test]
    async fn test_first_success_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = RetryPolicy::immediate(2)
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_returns_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = RetryPolicy::immediate(3)
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {n}")) }
            })
            .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
