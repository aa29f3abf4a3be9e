//! Retry policy behaviour.

use crate::backend::BackendError;
use crate::engine::RetryPolicy;
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_failures_are_retried_until_success() {
    let attempts = Arc::new(AtomicU32::new(0));
    let policy = fast_policy(5);

    let counter = Arc::clone(&attempts);
    let result: Result<u32, _> = policy
        .run(move || {
            let counter = Arc::clone(&counter);
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(BackendError::transient_status(503, "unavailable"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

    assert_eq!(result.expect("third attempt should succeed"), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn attempts_are_bounded() {
    let attempts = Arc::new(AtomicU32::new(0));
    let policy = fast_policy(3);

    let counter = Arc::clone(&attempts);
    let result: Result<(), _> = policy
        .run(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::transient("timeout"))
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 3, "exactly max_attempts tries");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn non_transient_failures_are_not_retried() {
    let attempts = Arc::new(AtomicU32::new(0));
    let policy = fast_policy(5);

    let counter = Arc::clone(&attempts);
    let result: Result<(), _> = policy
        .run(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::Auth("bad token".to_owned()))
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[rstest]
fn backoff_is_exponential_and_capped() {
    let policy = RetryPolicy::new(6, Duration::from_millis(100), Duration::from_millis(450));

    assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    assert_eq!(policy.delay_for(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    assert_eq!(policy.delay_for(3), Duration::from_millis(450), "capped");
    assert_eq!(policy.delay_for(30), Duration::from_millis(450), "still capped");
}
