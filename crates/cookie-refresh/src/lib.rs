//! Background refresh of expired account cookies
//!
//! A single long-lived worker scans the account store every
//! `check_interval` (30 minutes by default) for accounts whose cookie is
//! flagged expired, either on the record itself or in the runtime state
//! overlay, and hands each one to a `Refresher`, strictly one at a time.
//!
//! Worker lifecycle:
//! 1. Wait on the trigger signal until the interval elapses or a caller asks
//!    for an immediate scan via `TriggerHandle::trigger_immediate_refresh()`
//! 2. Skip the cycle unless the `auto_refresh_cookie` setting is on
//! 3. Refresh each expired account in index order, pausing `spacing` after each
//! 4. On a store failure, log it and cool down before waiting again
//! 5. Stop when the `CancellationToken` passed to `spawn_refresh_worker` fires

pub mod metrics;
pub mod operation;
pub mod trigger;
pub mod worker;

#[cfg(test)]
mod testing;

pub use operation::refresh_account;
pub use trigger::{TriggerHandle, TriggerSignal};
pub use worker::{CycleOutcome, RefreshSchedule, RefreshWorker, spawn_refresh_worker};
