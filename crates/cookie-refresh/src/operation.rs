//! Per-account refresh operation
//!
//! Validates the account, delegates to the configured `Refresher`, and writes
//! a refreshed cookie back through the `CredentialSink`. Every failure is
//! reduced to a log line and `false`; nothing propagates to the worker.

use account_store::{Account, CredentialSink};
use refresher::{RefreshError, RefreshOutcome, Refresher};
use tracing::{error, info, warn};

/// Attempt to refresh one account. Returns whether a new cookie was stored.
///
/// Accounts missing either temporary mailbox field are rejected without
/// calling the refresher.
pub async fn refresh_account(
    refresher: &dyn Refresher,
    sink: &dyn CredentialSink,
    index: usize,
    account: &Account,
) -> bool {
    if !account.has_tempmail() {
        warn!(
            account_index = index,
            error = %RefreshError::MissingTempmail(index),
            "cannot refresh automatically"
        );
        return false;
    }

    info!(
        account_index = index,
        tempmail_name = %account.tempmail_name,
        refresher = refresher.id(),
        "refreshing account cookie"
    );

    match refresher.refresh(index, account).await {
        Ok(RefreshOutcome::Refreshed { cookie }) => {
            match sink.store_refreshed_cookie(index, cookie).await {
                Ok(()) => true,
                Err(e) => {
                    error!(account_index = index, error = %e, "failed to persist refreshed cookie");
                    false
                }
            }
        }
        Ok(RefreshOutcome::ManualRequired) => false,
        Err(e) => {
            error!(account_index = index, error = %e, "cookie refresh attempt failed");
            false
        }
    }
}
