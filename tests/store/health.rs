use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use dbfuse_store::{
    BreakerConfig, GuardConfig, GuardedClient, HealthStatus, Statement,
};

use crate::fake::FakeDb;

fn guarded(db: &Arc<FakeDb>, write_threshold: u32, write_reset: Duration) -> GuardedClient<FakeDb> {
    GuardedClient::new(
        Arc::clone(db),
        GuardConfig::new(
            BreakerConfig::read_profile().build(),
            BreakerConfig::builder()
                .failure_threshold(write_threshold)
                .reset_timeout(write_reset)
                .build(),
        ),
    )
}

#[tokio::test]
async fn healthy_while_both_circuits_are_closed() {
    let db = Arc::new(FakeDb::new());
    let store = guarded(&db, 5, Duration::from_secs(60));

    let report = store.health();
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.http_status(), 200);
}

#[tokio::test]
async fn unhealthy_while_any_circuit_is_open() {
    let db = Arc::new(FakeDb::new());
    let store = guarded(&db, 1, Duration::from_secs(60));
    db.set_failing(true);

    let _ = store.write(&Statement::new("DELETE FROM sessions")).await;

    let report = store.health();
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.http_status(), 503);
    assert_eq!(report.write.failure_count, 1);
    assert_eq!(report.read.failure_count, 0);
}

#[tokio::test]
async fn degraded_while_a_trial_is_probing_recovery() {
    let db = Arc::new(FakeDb::new());
    let store = guarded(&db, 1, Duration::from_millis(100));

    db.set_failing(true);
    let _ = store.write(&Statement::new("DELETE FROM sessions")).await;
    assert_eq!(store.health().status, HealthStatus::Unhealthy);

    // Recover the driver, slow it down, and let a trial hang in half-open.
    db.set_failing(false);
    db.set_latency(Some(Duration::from_millis(200)));
    sleep(Duration::from_millis(150)).await;

    let probe_store = store.clone();
    let probe = tokio::spawn(async move {
        probe_store
            .write(&Statement::new("DELETE FROM sessions"))
            .await
    });

    sleep(Duration::from_millis(50)).await;
    assert_eq!(store.health().status, HealthStatus::Degraded);

    assert!(probe.await.unwrap().is_ok());
    assert_eq!(store.health().status, HealthStatus::Healthy);
}

#[tokio::test]
async fn report_never_mutates_breaker_state() {
    let db = Arc::new(FakeDb::new());
    let store = guarded(&db, 5, Duration::from_secs(60));

    let _ = store.read(&Statement::new("SELECT 1")).await;
    let before = store.metrics();
    for _ in 0..10 {
        let _ = store.health();
    }
    let after = store.metrics();

    assert_eq!(before.read.total_requests, after.read.total_requests);
    assert_eq!(before.write.total_requests, after.write.total_requests);
}

#[tokio::test]
async fn report_serializes_to_the_monitoring_shape() {
    let db = Arc::new(FakeDb::new());
    let store = guarded(&db, 5, Duration::from_secs(60));
    let _ = store.read(&Statement::new("SELECT 1")).await;

    let json = serde_json::to_value(store.health()).unwrap();

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["read"]["state"], "CLOSED");
    assert_eq!(json["write"]["state"], "CLOSED");
    assert_eq!(json["read"]["total_requests"], 1);
    assert!(json["read"]["uptime_ms"].is_u64());
    assert!(json["read"]["failure_rate"].is_number());
}
