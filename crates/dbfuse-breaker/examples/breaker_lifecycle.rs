//! Circuit breaker lifecycle walkthrough.
//!
//! Trips a breaker with consecutive failures, shows the fail-fast window,
//! then lets a half-open trial recover the circuit.
//!
//! Run with:
//! ```sh
//! cargo run --example breaker_lifecycle
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dbfuse_breaker::{BreakerConfig, BreakerError, CircuitBreaker};

#[derive(Debug)]
struct DbError(&'static str);

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DbError {}

#[tokio::main]
async fn main() {
    let breaker = CircuitBreaker::new(
        BreakerConfig::builder()
            .failure_threshold(3)
            .reset_timeout(Duration::from_millis(500))
            .name("demo")
            .on_state_transition(|from, to| {
                println!("  [event] circuit {from:?} -> {to:?}");
            })
            .build(),
    );

    let healthy = Arc::new(AtomicBool::new(false));

    println!("--- Phase 1: database down, three failures trip the circuit ---");
    for attempt in 1..=3 {
        let outcome = call_database(&breaker, &healthy).await;
        println!("attempt {attempt}: {outcome}");
    }

    println!("\n--- Phase 2: circuit open, calls fail fast ---");
    for attempt in 1..=2 {
        let outcome = call_database(&breaker, &healthy).await;
        println!("attempt {attempt}: {outcome}");
    }

    println!("\n--- Phase 3: database recovers, trial closes the circuit ---");
    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(600)).await;

    let outcome = call_database(&breaker, &healthy).await;
    println!("trial: {outcome}");

    let metrics = breaker.metrics();
    println!(
        "\nfinal state: {:?}, {} requests, {} failures, {} successes, opened {} time(s)",
        metrics.state,
        metrics.total_requests,
        metrics.total_failures,
        metrics.total_successes,
        metrics.times_opened,
    );
}

async fn call_database(breaker: &CircuitBreaker, healthy: &Arc<AtomicBool>) -> String {
    let healthy = Arc::clone(healthy);
    let result = breaker
        .execute(|| async move {
            if healthy.load(Ordering::SeqCst) {
                Ok("42 rows")
            } else {
                Err(DbError("connection refused"))
            }
        })
        .await;

    match result {
        Ok(rows) => format!("ok ({rows})"),
        Err(BreakerError::CircuitOpen { retry_after, .. }) => {
            format!("rejected, retry after {retry_after:?}")
        }
        Err(err) => format!("failed ({err})"),
    }
}
