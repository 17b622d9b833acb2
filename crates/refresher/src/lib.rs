//! Cookie refresh capability
//!
//! Defines the `Refresher` trait that decouples the background worker from
//! the mechanism used to obtain a fresh session cookie. `ManualRefresher` is
//! the default: it never refreshes anything and reports that an operator has
//! to log in through the admin panel. A real implementation would drive the
//! login flow through the account's temporary mailbox and return the new
//! cookie as `RefreshOutcome::Refreshed`.

pub mod manual;

pub use manual::ManualRefresher;

use std::future::Future;
use std::pin::Pin;

use account_store::Account;
use common::Secret;

/// Result of a single refresh attempt that did not error.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new session cookie was obtained and should be written back.
    Refreshed { cookie: Secret<String> },
    /// The account cannot be refreshed automatically; an operator must act.
    ManualRequired,
}

/// Errors from a refresh attempt.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("account {0} has no temporary mailbox configured")]
    MissingTempmail(usize),

    #[error("login flow failed: {0}")]
    Upstream(String),
}

/// Result alias for refresher operations.
pub type Result<T> = std::result::Result<T, RefreshError>;

/// Abstraction over cookie refresh strategies.
///
/// Called once per expired account, strictly sequentially. Implementations
/// may assume the account has both tempmail fields; the caller validates them
/// before invoking `refresh`.
pub trait Refresher: Send + Sync {
    /// Identifier for logging (e.g. "manual").
    fn id(&self) -> &str;

    /// Attempt to obtain a fresh session cookie for the account at `index`.
    fn refresh<'a>(
        &'a self,
        index: usize,
        account: &'a Account,
    ) -> Pin<Box<dyn Future<Output = Result<RefreshOutcome>> + Send + 'a>>;
}
