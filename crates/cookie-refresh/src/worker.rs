//! Background cookie refresh worker
//!
//! Sleeps on the trigger signal for `check_interval`, then scans the account
//! store for expired cookies and refreshes them one at a time, `spacing`
//! apart. A failing account never aborts the cycle; a failing cycle is logged
//! and followed by `error_cooldown` before the worker waits again.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use account_store::{
    AUTO_REFRESH_COOKIE, Account, AccountSource, ConfigSource, CredentialSink,
    is_effectively_expired,
};
use futures_util::FutureExt;
use refresher::Refresher;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::metrics;
use crate::operation::refresh_account;
use crate::trigger::{TriggerHandle, TriggerSignal};

/// Default time between scheduled scans.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Default pause after each account in a cycle.
pub const DEFAULT_SPACING: Duration = Duration::from_secs(30);

/// Default pause after a cycle fails before waiting again.
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(60);

/// Timing knobs for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    pub check_interval: Duration,
    pub spacing: Duration,
    pub error_cooldown: Duration,
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            spacing: DEFAULT_SPACING,
            error_cooldown: DEFAULT_ERROR_COOLDOWN,
        }
    }
}

/// How a single cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// `auto_refresh_cookie` is off; nothing was scanned.
    Disabled,
    /// No account had an expired cookie.
    Idle,
    /// Every expired account was attempted.
    Completed { attempted: usize, refreshed: usize },
    /// Cancellation arrived before the last account.
    Cancelled { attempted: usize, refreshed: usize },
}

impl CycleOutcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Disabled => "disabled",
            CycleOutcome::Idle => "idle",
            CycleOutcome::Completed { .. } => "completed",
            CycleOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

/// Periodic scanner that refreshes expired account cookies.
pub struct RefreshWorker {
    config: Arc<dyn ConfigSource>,
    accounts: Arc<dyn AccountSource>,
    sink: Arc<dyn CredentialSink>,
    refresher: Arc<dyn Refresher>,
    schedule: RefreshSchedule,
    signal: Arc<TriggerSignal>,
}

impl RefreshWorker {
    /// Create a worker reading from separate collaborators.
    pub fn new(
        config: Arc<dyn ConfigSource>,
        accounts: Arc<dyn AccountSource>,
        sink: Arc<dyn CredentialSink>,
        refresher: Arc<dyn Refresher>,
        schedule: RefreshSchedule,
    ) -> Self {
        Self {
            config,
            accounts,
            sink,
            refresher,
            schedule,
            signal: Arc::new(TriggerSignal::new()),
        }
    }

    /// Create a worker whose store provides settings, accounts and write-back.
    pub fn from_store<S>(store: Arc<S>, refresher: Arc<dyn Refresher>, schedule: RefreshSchedule) -> Self
    where
        S: ConfigSource + AccountSource + CredentialSink + 'static,
    {
        Self::new(store.clone(), store.clone(), store, refresher, schedule)
    }

    /// Handle other components use to request an immediate scan.
    pub fn trigger_handle(&self) -> TriggerHandle {
        TriggerHandle::new(self.signal.clone())
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            check_interval_secs = self.schedule.check_interval.as_secs(),
            spacing_secs = self.schedule.spacing.as_secs(),
            refresher = self.refresher.id(),
            "cookie refresh worker started"
        );

        loop {
            let triggered = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                triggered = self.signal.wait_or_timeout(self.schedule.check_interval) => triggered,
            };

            if triggered {
                self.signal.consume();
                info!("immediate cookie refresh requested");
            }

            match self.run_cycle(&cancel).await {
                Ok(outcome) => metrics::record_cycle(outcome.label()),
                Err(e) => {
                    metrics::record_cycle("failed");
                    error!(
                        error = %e,
                        cooldown_secs = self.schedule.error_cooldown.as_secs(),
                        "cookie refresh cycle failed"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.schedule.error_cooldown) => {}
                    }
                }
            }
        }

        info!("cookie refresh worker stopped");
    }

    /// Run one scan-and-refresh pass.
    ///
    /// Returns `Err` only when the settings or account reads fail; per-account
    /// failures are logged and counted instead.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> account_store::Result<CycleOutcome> {
        if !self.config.get_flag(AUTO_REFRESH_COOKIE, false).await? {
            return Ok(CycleOutcome::Disabled);
        }

        let expired = self.expired_accounts().await?;
        metrics::set_expired_accounts(expired.len());
        if expired.is_empty() {
            return Ok(CycleOutcome::Idle);
        }

        info!(count = expired.len(), "found accounts with expired cookies");

        let mut attempted = 0usize;
        let mut refreshed = 0usize;

        for (index, account) in expired {
            if cancel.is_cancelled() {
                return Ok(CycleOutcome::Cancelled { attempted, refreshed });
            }
            attempted += 1;

            let result = AssertUnwindSafe(refresh_account(
                self.refresher.as_ref(),
                self.sink.as_ref(),
                index,
                &account,
            ))
            .catch_unwind()
            .await;

            match result {
                Ok(true) => {
                    refreshed += 1;
                    metrics::record_attempt("refreshed");
                    info!(account_index = index, "account cookie refreshed");
                }
                Ok(false) => {
                    metrics::record_attempt("failed");
                    warn!(
                        account_index = index,
                        "account cookie refresh failed, manual refresh required"
                    );
                }
                Err(panic) => {
                    metrics::record_attempt("panicked");
                    error!(
                        account_index = index,
                        error = panic_message(panic.as_ref()),
                        "account cookie refresh panicked"
                    );
                    continue;
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(CycleOutcome::Cancelled { attempted, refreshed });
                }
                _ = tokio::time::sleep(self.schedule.spacing) => {}
            }
        }

        Ok(CycleOutcome::Completed { attempted, refreshed })
    }

    /// Expired accounts in ascending index order.
    ///
    /// The account list and the state overlay are read separately and may
    /// come from different moments; an overlay entry for a missing index is
    /// ignored.
    async fn expired_accounts(&self) -> account_store::Result<Vec<(usize, Account)>> {
        let accounts = self.accounts.accounts().await?;
        let states = self.accounts.account_states().await?;

        Ok(accounts
            .into_iter()
            .enumerate()
            .filter(|(index, account)| is_effectively_expired(account, states.get(index)))
            .collect())
    }
}

/// Spawn the worker as a background task. Cancel `cancel` to stop it.
pub fn spawn_refresh_worker(
    worker: RefreshWorker,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(worker.run(cancel))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
