//! Tests for the RetryEngine implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vigil_error::{VigilError, VigilErrorKind};
use vigil_retry::{BackoffPolicy, CircuitBreaker, CircuitState, RetryEngine};

fn fast_policy(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
        jitter_factor: 0.1,
    }
}

fn transport_error() -> VigilError {
    VigilError::new(VigilErrorKind::Transport("connection reset".to_string()))
}

#[tokio::test]
async fn test_succeeds_after_transient_failures() {
    let engine = RetryEngine::new(Arc::new(CircuitBreaker::new(10, Duration::from_secs(30))));
    let calls = AtomicU32::new(0);

    let success = engine
        .execute_with_retry(&fast_policy(3), &CancellationToken::new(), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(transport_error())
                } else {
                    Ok(attempt * 10)
                }
            }
        })
        .await
        .expect("third attempt succeeds");

    assert_eq!(*success.value(), 30);
    assert_eq!(*success.attempts(), 3);
    assert_eq!(success.failures().len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(engine.breaker().consecutive_failures(), 0);
}

#[tokio::test]
async fn test_exhaustion_returns_all_attempt_errors() {
    let engine = RetryEngine::new(Arc::new(CircuitBreaker::new(10, Duration::from_secs(30))));

    let failure = engine
        .execute_with_retry(&fast_policy(4), &CancellationToken::new(), |_| async {
            Err::<(), _>(transport_error())
        })
        .await
        .expect_err("every attempt fails");

    let numbers: Vec<u32> = failure.attempts().iter().map(|a| *a.number()).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(matches!(failure.error().kind(), VigilErrorKind::Transport(_)));
}

#[tokio::test]
async fn test_non_retryable_error_short_circuits() {
    let engine = RetryEngine::default();
    let calls = AtomicU32::new(0);

    let failure = engine
        .execute_with_retry(&fast_policy(5), &CancellationToken::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(VigilError::new(VigilErrorKind::Auth("bad key".to_string()))) }
        })
        .await
        .expect_err("auth failure is surfaced");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(failure.attempts().len(), 1);
    assert!(matches!(failure.error().kind(), VigilErrorKind::Auth(_)));
    // Auth errors are not remote failures and leave the breaker alone
    assert_eq!(engine.breaker().consecutive_failures(), 0);
}

#[tokio::test]
async fn test_open_circuit_fails_fast_without_invoking_operation() {
    let engine = RetryEngine::new(Arc::new(CircuitBreaker::new(3, Duration::from_secs(60))));

    for _ in 0..3 {
        let _ = engine
            .execute_with_retry(&fast_policy(1), &CancellationToken::new(), |_| async {
                Err::<(), _>(transport_error())
            })
            .await;
    }
    assert_eq!(engine.breaker().state(), CircuitState::Open);

    let calls = AtomicU32::new(0);
    let failure = engine
        .execute_with_retry(&fast_policy(3), &CancellationToken::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, VigilError>(()) }
        })
        .await
        .expect_err("circuit is open");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(failure.attempts().is_empty());
    assert!(matches!(failure.error().kind(), VigilErrorKind::CircuitOpen { .. }));
}

#[tokio::test]
async fn test_breaker_opens_mid_call() {
    let engine = RetryEngine::new(Arc::new(CircuitBreaker::new(2, Duration::from_secs(60))));
    let calls = AtomicU32::new(0);

    let failure = engine
        .execute_with_retry(&fast_policy(5), &CancellationToken::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(transport_error()) }
        })
        .await
        .expect_err("breaker trips");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(matches!(failure.error().kind(), VigilErrorKind::CircuitOpen { .. }));
}

#[tokio::test]
async fn test_attempt_timeout_is_retryable() {
    let engine = RetryEngine::default().with_attempt_timeout(Duration::from_millis(10));

    let success = engine
        .execute_with_retry(&fast_policy(2), &CancellationToken::new(), |attempt| async move {
            if attempt == 1 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok::<_, VigilError>(attempt)
        })
        .await
        .expect("second attempt succeeds");

    assert_eq!(*success.attempts(), 2);
    assert!(matches!(
        success.failures()[0].error().kind(),
        VigilErrorKind::Timeout(_)
    ));
}

#[tokio::test]
async fn test_cancellation_stops_attempts() {
    let engine = RetryEngine::default();
    let cancel = CancellationToken::new();
    let calls = Arc::new(AtomicU32::new(0));

    let policy = BackoffPolicy {
        max_attempts: 5,
        initial_delay: Duration::from_secs(10),
        max_delay: Duration::from_secs(10),
        multiplier: 1.0,
        jitter_factor: 0.0,
    };

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let counter = calls.clone();
    let failure = engine
        .execute_with_retry(&policy, &cancel, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(transport_error()) }
        })
        .await
        .expect_err("cancelled during backoff");

    assert!(matches!(failure.error().kind(), VigilErrorKind::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_validation_failure_is_retried_without_tripping_breaker() {
    let engine = RetryEngine::new(Arc::new(CircuitBreaker::new(1, Duration::from_secs(60))));

    let success = engine
        .execute_with_retry(&fast_policy(3), &CancellationToken::new(), |attempt| async move {
            if attempt == 1 {
                Err(VigilError::new(VigilErrorKind::ValidationFailed(
                    "too small".to_string(),
                )))
            } else {
                Ok(attempt)
            }
        })
        .await
        .expect("validation failure retried");

    assert_eq!(*success.attempts(), 2);
    assert_eq!(engine.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_notify_sees_each_failure_before_next_attempt() {
    let engine = RetryEngine::new(Arc::new(CircuitBreaker::new(10, Duration::from_secs(30))));
    let log = parking_lot::Mutex::new(Vec::new());

    let success = engine
        .execute_with_retry_notify(
            &fast_policy(3),
            &CancellationToken::new(),
            |attempt| {
                log.lock().push(format!("attempt {}", attempt));
                async move {
                    if attempt < 3 {
                        Err(transport_error())
                    } else {
                        Ok(())
                    }
                }
            },
            |failed| log.lock().push(format!("failed {}", failed.number())),
        )
        .await
        .expect("third attempt succeeds");

    assert_eq!(*success.attempts(), 3);
    assert_eq!(
        *log.lock(),
        vec!["attempt 1", "failed 1", "attempt 2", "failed 2", "attempt 3"]
    );
}
