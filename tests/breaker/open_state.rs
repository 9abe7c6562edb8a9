use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dbfuse_breaker::{BreakerConfig, BreakerError, CircuitBreaker, CircuitState};

#[tokio::test]
async fn open_circuit_never_invokes_the_operation() {
    let cb = CircuitBreaker::new(
        BreakerConfig::builder()
            .failure_threshold(1)
            .reset_timeout(Duration::from_secs(60))
            .name("open")
            .build(),
    );

    let invocations = Arc::new(AtomicUsize::new(0));

    let inv = Arc::clone(&invocations);
    let _ = cb
        .execute(|| async move {
            inv.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("down")
        })
        .await;
    assert_eq!(cb.state(), CircuitState::Open);

    for _ in 0..5 {
        let inv = Arc::clone(&invocations);
        let result = cb
            .execute(|| async move {
                inv.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>(())
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_circuit_open());
    }

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    // Rejected calls are not completed operations; totals are unchanged.
    assert_eq!(cb.metrics().total_requests, 1);
}

#[tokio::test]
async fn rejection_reports_remaining_wait() {
    let cb = CircuitBreaker::new(
        BreakerConfig::builder()
            .failure_threshold(1)
            .reset_timeout(Duration::from_secs(1))
            .name("open")
            .build(),
    );

    let _ = cb.execute(|| async { Err::<(), _>("down") }).await;

    let first = cb
        .execute(|| async { Ok::<_, &'static str>(()) })
        .await
        .unwrap_err();
    let first_wait = first.retry_after().expect("rejection carries retry_after");
    assert!(first_wait <= Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = cb
        .execute(|| async { Ok::<_, &'static str>(()) })
        .await
        .unwrap_err();
    let second_wait = second.retry_after().expect("rejection carries retry_after");
    assert!(second_wait < first_wait);
}

#[tokio::test]
async fn rejection_is_distinguishable_from_operation_failure() {
    let cb = CircuitBreaker::new(
        BreakerConfig::builder()
            .failure_threshold(1)
            .reset_timeout(Duration::from_secs(60))
            .name("channel-a")
            .build(),
    );

    let failure = cb
        .execute(|| async { Err::<(), _>("constraint violation") })
        .await
        .unwrap_err();
    assert!(!failure.is_circuit_open());
    assert!(!failure.is_timeout());

    let rejection = cb
        .execute(|| async { Ok::<_, &'static str>(()) })
        .await
        .unwrap_err();
    assert!(rejection.is_circuit_open());
    assert!(rejection.into_inner().is_none());

    match cb
        .execute(|| async { Ok::<_, &'static str>(()) })
        .await
        .unwrap_err()
    {
        BreakerError::CircuitOpen { name, .. } => assert_eq!(name, "channel-a"),
        other => panic!("expected CircuitOpen, got {other:?}"),
    }
}
