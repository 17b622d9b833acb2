//! Account record and per-index state overlay

use std::fmt;

use serde::{Deserialize, Serialize};

/// A managed account as persisted in the account file.
///
/// `tempmail_name` and `tempmail_url` identify the temporary mailbox used to
/// receive login codes; an account without both cannot be refreshed
/// automatically. Missing fields deserialize to empty/false.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub tempmail_name: String,
    #[serde(default)]
    pub tempmail_url: String,
    #[serde(default)]
    pub cookie_expired: bool,
    /// Current session cookie. Written back after a successful refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl Account {
    /// Whether both temporary mailbox fields are present.
    pub fn has_tempmail(&self) -> bool {
        !self.tempmail_name.is_empty() && !self.tempmail_url.is_empty()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("tempmail_name", &self.tempmail_name)
            .field("tempmail_url", &self.tempmail_url)
            .field("cookie_expired", &self.cookie_expired)
            .field("cookie", &self.cookie.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Runtime flags layered over an account, keyed by account index.
///
/// Set by other components (e.g. a request handler that saw the upstream
/// reject a cookie) without touching the persisted record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    pub cookie_expired: bool,
}

/// Effective expired flag: either the record or its overlay marks it expired.
pub fn is_effectively_expired(account: &Account, state: Option<&AccountState>) -> bool {
    account.cookie_expired || state.is_some_and(|s| s.cookie_expired)
}
