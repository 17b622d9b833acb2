//! File-backed account store
//!
//! Holds a JSON document with runtime settings and the ordered account list.
//! All writes use atomic temp-file + rename to prevent corruption on crash. A
//! tokio Mutex serializes concurrent writes from the admin API and the refresh
//! worker's cookie write-back.
//!
//! The per-index state overlay is kept in memory only; it records what other
//! components observed at runtime and is rebuilt empty on restart.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::account::{Account, AccountState};
use crate::error::{Error, Result};
use crate::source::{AccountSource, ConfigSource, CredentialSink};

/// On-disk layout of the account file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    settings: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    accounts: Vec<Account>,
}

/// Thread-safe account file manager.
///
/// Reads acquire the lock briefly to clone the in-memory state, so the refresh
/// worker never holds the lock across a refresh attempt.
pub struct AccountStore {
    path: PathBuf,
    document: Mutex<Document>,
    states: Mutex<HashMap<usize, AccountState>>,
}

impl AccountStore {
    /// Load the account file from the given path.
    ///
    /// If the file doesn't exist, creates it with no accounts and no settings
    /// (auto refresh therefore starts disabled).
    pub async fn load(path: PathBuf) -> Result<Self> {
        let document = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading account file: {e}")))?;
            let document: Document = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing account file: {e}")))?;
            info!(
                path = %path.display(),
                accounts = document.accounts.len(),
                "loaded accounts"
            );
            document
        } else {
            info!(path = %path.display(), "account file not found, starting with empty store");
            let document = Document::default();
            write_atomic(&path, &document).await?;
            document
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
            states: Mutex::new(HashMap::new()),
        })
    }

    /// Persist the current document to disk.
    pub async fn save(&self) -> Result<()> {
        let document = self.document.lock().await;
        write_atomic(&self.path, &document).await
    }

    /// Snapshot of all accounts in index order.
    pub async fn accounts(&self) -> Vec<Account> {
        self.document.lock().await.accounts.clone()
    }

    /// Snapshot of the state overlay.
    pub async fn account_states(&self) -> HashMap<usize, AccountState> {
        self.states.lock().await.clone()
    }

    /// Read a boolean setting.
    ///
    /// A present but non-boolean value is treated as absent.
    pub async fn get_flag(&self, key: &str, default: bool) -> bool {
        let document = self.document.lock().await;
        match document.settings.get(key) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(other) => {
                warn!(key, value = %other, "setting is not a boolean, using default");
                default
            }
            None => default,
        }
    }

    /// Set a boolean setting and persist to disk.
    pub async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        let mut document = self.document.lock().await;
        document
            .settings
            .insert(key.to_string(), serde_json::Value::Bool(value));
        debug!(key, value, "updated setting");
        write_atomic(&self.path, &document).await
    }

    /// Append an account and persist to disk. Returns the new index.
    pub async fn add_account(&self, account: Account) -> Result<usize> {
        let mut document = self.document.lock().await;
        document.accounts.push(account);
        let index = document.accounts.len() - 1;
        debug!(account_index = index, "added account");
        write_atomic(&self.path, &document).await?;
        Ok(index)
    }

    /// Flag an account's cookie as expired in the runtime overlay.
    pub async fn mark_state_expired(&self, index: usize) -> Result<()> {
        if index >= self.len().await {
            return Err(Error::NotFound(index));
        }
        self.states
            .lock()
            .await
            .entry(index)
            .or_default()
            .cookie_expired = true;
        info!(account_index = index, "account cookie marked expired");
        Ok(())
    }

    /// Store a refreshed cookie for `index`, clearing both expired flags.
    pub async fn update_cookie(&self, index: usize, cookie: Secret<String>) -> Result<()> {
        {
            let mut document = self.document.lock().await;
            let account = document
                .accounts
                .get_mut(index)
                .ok_or(Error::NotFound(index))?;
            account.cookie = Some(cookie.expose().clone());
            account.cookie_expired = false;
            write_atomic(&self.path, &document).await?;
        }
        if let Some(state) = self.states.lock().await.get_mut(&index) {
            state.cookie_expired = false;
        }
        debug!(account_index = index, "updated cookie");
        Ok(())
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.document.lock().await.accounts.len()
    }

    /// Whether the store has no accounts.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl ConfigSource for AccountStore {
    fn get_flag<'a>(
        &'a self,
        key: &'a str,
        default: bool,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move { Ok(AccountStore::get_flag(self, key, default).await) })
    }
}

impl AccountSource for AccountStore {
    fn accounts(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Account>>> + Send + '_>> {
        Box::pin(async move { Ok(AccountStore::accounts(self).await) })
    }

    fn account_states(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<HashMap<usize, AccountState>>> + Send + '_>> {
        Box::pin(async move { Ok(AccountStore::account_states(self).await) })
    }
}

impl CredentialSink for AccountStore {
    fn store_refreshed_cookie(
        &self,
        index: usize,
        cookie: Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.update_cookie(index, cookie).await })
    }
}

/// Write the document to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets permissions to 0600 since the file holds session cookies.
async fn write_atomic(path: &Path, document: &Document) -> Result<()> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| Error::Parse(format!("serializing accounts: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("account path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".accounts.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp account file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting account file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp account file: {e}")))?;

    debug!(path = %path.display(), "persisted accounts");
    Ok(())
}
