use std::time::Duration;

use dbfuse_breaker::{BreakerConfig, BreakerError, CircuitBreaker, CircuitState};

fn breaker(threshold: u32) -> CircuitBreaker {
    CircuitBreaker::new(
        BreakerConfig::builder()
            .failure_threshold(threshold)
            .reset_timeout(Duration::from_secs(60))
            .name("thresholds")
            .build(),
    )
}

async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
    cb.execute(|| async { Err::<(), _>("boom") }).await
}

async fn succeed(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
    cb.execute(|| async { Ok::<_, &'static str>(()) }).await
}

#[tokio::test]
async fn opens_exactly_at_threshold() {
    let cb = breaker(3);

    for _ in 0..2 {
        assert!(fail(&cb).await.is_err());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    assert!(fail(&cb).await.is_err());
    assert_eq!(cb.state(), CircuitState::Open);
    assert_eq!(cb.metrics().times_opened, 1);
}

#[tokio::test]
async fn tripping_failure_surfaces_the_original_error() {
    let cb = breaker(3);
    let _ = fail(&cb).await;
    let _ = fail(&cb).await;

    // The third failure trips the circuit but is still the operation's own
    // error; only subsequent calls see the fail-fast rejection.
    let third = fail(&cb).await.unwrap_err();
    assert!(!third.is_circuit_open());
    assert_eq!(third.into_inner(), Some("boom"));

    let fourth = fail(&cb).await.unwrap_err();
    assert!(fourth.is_circuit_open());
}

#[tokio::test]
async fn success_resets_consecutive_count() {
    let cb = breaker(3);

    let _ = fail(&cb).await;
    let _ = fail(&cb).await;
    assert!(succeed(&cb).await.is_ok());
    assert_eq!(cb.metrics().failure_count, 0);

    let _ = fail(&cb).await;
    let _ = fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);

    let _ = fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test]
async fn threshold_of_one_trips_on_first_failure() {
    let cb = breaker(1);
    let _ = fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);
}

#[test]
#[should_panic(expected = "failure_threshold must be at least 1")]
fn zero_threshold_is_rejected() {
    let _ = BreakerConfig::builder().failure_threshold(0).build();
}

#[test]
fn profiles_carry_channel_names() {
    assert_eq!(BreakerConfig::read_profile().build().name(), "read");
    assert_eq!(BreakerConfig::write_profile().build().name(), "write");
}
