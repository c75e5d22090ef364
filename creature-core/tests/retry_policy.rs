//! Retry timing tests on a paused tokio clock.

use creature_core::RetryPolicy;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, PartialEq)]
struct Flaky(u32);

impl std::fmt::Display for Flaky {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attempt {} failed", self.0)
    }
}

#[tokio::test(start_paused = true)]
async fn test_two_failures_then_success() {
    let attempts = AtomicU32::new(0);
    let mut started_at = Vec::new();
    let start = Instant::now();

    let result = RetryPolicy::default()
        .run("flaky", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            started_at.push(start.elapsed());
            async move {
                if n < 3 {
                    Err(Flaky(n))
                } else {
                    Ok("光水母龙")
                }
            }
        })
        .await;

    assert_eq!(result, Ok("光水母龙"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
        started_at,
        vec![
            Duration::ZERO,
            Duration::from_millis(1000),
            Duration::from_millis(2500),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_last_error() {
    let attempts = AtomicU32::new(0);
    let start = Instant::now();

    let result: Result<(), Flaky> = RetryPolicy::default()
        .run("always_failing", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(Flaky(n)) }
        })
        .await;

    assert_eq!(result, Err(Flaky(3)));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(2500));
}

#[tokio::test(start_paused = true)]
async fn test_success_does_not_wait() {
    let start = Instant::now();
    let result: Result<u32, Flaky> = RetryPolicy::default().run("steady", || async { Ok(7) }).await;

    assert_eq!(result, Ok(7));
    assert_eq!(start.elapsed(), Duration::ZERO);
}
