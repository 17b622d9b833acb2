//! Collaborator traits the refresh worker reads and writes through
//!
//! Uses `Pin<Box<dyn Future>>` return types so the worker can hold
//! `Arc<dyn AccountSource>` and tests can substitute failing fakes.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use common::Secret;

use crate::account::{Account, AccountState};
use crate::error::Result;

/// Settings key gating the background cookie refresh.
pub const AUTO_REFRESH_COOKIE: &str = "auto_refresh_cookie";

/// Runtime key-value settings.
pub trait ConfigSource: Send + Sync {
    /// Read a boolean setting, returning `default` when the key is absent.
    fn get_flag<'a>(
        &'a self,
        key: &'a str,
        default: bool,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}

/// Read access to managed accounts.
///
/// The two reads are independent: callers must not assume the state map was
/// taken from the same snapshot as the account list.
pub trait AccountSource: Send + Sync {
    /// All accounts in index order.
    fn accounts(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Account>>> + Send + '_>>;

    /// Per-index state overlay. Indices without an entry have default state.
    fn account_states(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<HashMap<usize, AccountState>>> + Send + '_>>;
}

/// Write-back of credentials obtained by a successful refresh.
pub trait CredentialSink: Send + Sync {
    /// Replace the session cookie for `index` and clear its expired flags.
    fn store_refreshed_cookie(
        &self,
        index: usize,
        cookie: Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
