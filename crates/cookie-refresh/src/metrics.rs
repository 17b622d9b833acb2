//! Metrics emitted by the refresh worker
//!
//! - `cookie_refresh_cycles_total` (counter): label `result`
//! - `cookie_refresh_attempts_total` (counter): label `outcome`
//! - `cookie_refresh_triggers_total` (counter)
//! - `cookie_refresh_expired_accounts` (gauge): expired accounts seen by the last scan
//!
//! Without an installed recorder every call is a no-op.

/// Record the end of a cycle (`disabled`, `idle`, `completed`, `cancelled`, `failed`).
pub fn record_cycle(result: &'static str) {
    metrics::counter!("cookie_refresh_cycles_total", "result" => result).increment(1);
}

/// Record one per-account attempt (`refreshed`, `failed`, `panicked`).
pub fn record_attempt(outcome: &'static str) {
    metrics::counter!("cookie_refresh_attempts_total", "outcome" => outcome).increment(1);
}

/// Record an immediate-refresh request.
pub fn record_trigger() {
    metrics::counter!("cookie_refresh_triggers_total").increment(1);
}

/// Publish the number of expired accounts found by the latest scan.
pub fn set_expired_accounts(count: usize) {
    metrics::gauge!("cookie_refresh_expired_accounts").set(count as f64);
}
