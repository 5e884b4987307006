#![allow(clippy::unwrap_used)]
// Allow unwrap used because we are using lazy_static, and the only way to handle errors is to unwrap

use lazy_static::lazy_static;
use prometheus::{IntCounter, Registry};

lazy_static! {
    pub static ref INFRA_REGISTRY: Registry = Registry::new();
    pub static ref BUSY_FETCH_FAILURES: IntCounter = IntCounter::new(
        "busy_fetch_failures_total",
        "Free/busy fetches that failed or timed out, per attempt"
    )
    .unwrap();
    pub static ref TOKEN_REFRESH_FAILURES: IntCounter = IntCounter::new(
        "token_refresh_failures_total",
        "OAuth token refreshes that failed and invalidated an account"
    )
    .unwrap();
    pub static ref EXTERNAL_EVENT_WRITE_FAILURES: IntCounter = IntCounter::new(
        "external_event_write_failures_total",
        "Post-commit calendar event writes that failed"
    )
    .unwrap();
    pub static ref BOOKINGS_COMMITTED: IntCounter = IntCounter::new(
        "bookings_committed_total",
        "Bookings that became durable"
    )
    .unwrap();
}

pub fn register_metrics() -> anyhow::Result<()> {
    INFRA_REGISTRY.register(Box::new(BUSY_FETCH_FAILURES.clone()))?;
    INFRA_REGISTRY.register(Box::new(TOKEN_REFRESH_FAILURES.clone()))?;
    INFRA_REGISTRY.register(Box::new(EXTERNAL_EVENT_WRITE_FAILURES.clone()))?;
    INFRA_REGISTRY.register(Box::new(BOOKINGS_COMMITTED.clone()))?;

    Ok(())
}
