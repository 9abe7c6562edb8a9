use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dbfuse_store::{BreakerConfig, Channel, CircuitState, GuardConfig, GuardedClient, Statement};

use crate::fake::FakeDb;

#[tokio::test]
async fn write_outage_leaves_reads_flowing() {
    let db = Arc::new(FakeDb::new());
    let store = GuardedClient::new(
        Arc::clone(&db),
        GuardConfig::new(
            BreakerConfig::builder()
                .failure_threshold(3)
                .reset_timeout(Duration::from_secs(60))
                .build(),
            BreakerConfig::builder()
                .failure_threshold(2)
                .reset_timeout(Duration::from_secs(60))
                .build(),
        ),
    );

    // Writes fail until the write breaker opens.
    db.set_failing(true);
    let insert = Statement::new("INSERT INTO sessions (token) VALUES (?)").bind("abc");
    for _ in 0..2 {
        let _ = store.write(&insert).await;
    }
    assert_eq!(
        store.registry().get(Channel::Write).state(),
        CircuitState::Open
    );

    // The underlying outage clears; reads reach the database immediately
    // even though the write circuit is still open.
    db.set_failing(false);
    let calls_before = db.run_calls.load(Ordering::SeqCst);
    for _ in 0..3 {
        let rows = store.read(&Statement::new("SELECT 1")).await.unwrap();
        assert_eq!(rows.rows_affected, 1);
    }
    assert_eq!(db.run_calls.load(Ordering::SeqCst), calls_before + 3);

    let read_metrics = store.registry().get(Channel::Read).metrics();
    assert_eq!(read_metrics.state, CircuitState::Closed);
    assert_eq!(read_metrics.failure_count, 0);

    // Writes are still rejected until their own window elapses.
    assert!(store.write(&insert).await.unwrap_err().is_circuit_open());
}

#[tokio::test]
async fn independent_wrappers_do_not_share_breakers() {
    let db = Arc::new(FakeDb::new());
    let first = GuardedClient::with_defaults(Arc::clone(&db));
    let second = GuardedClient::with_defaults(Arc::clone(&db));

    db.set_failing(true);
    for _ in 0..3 {
        let _ = first.read(&Statement::new("SELECT 1")).await;
    }
    assert_eq!(
        first.registry().get(Channel::Read).state(),
        CircuitState::Open
    );

    // The second wrapper has its own registry over the same driver.
    assert_eq!(
        second.registry().get(Channel::Read).state(),
        CircuitState::Closed
    );
    db.set_failing(false);
    assert!(second.read(&Statement::new("SELECT 1")).await.is_ok());
}
