//! Managed account records and the store the refresh worker reads from
//!
//! The refresh worker never owns account data. It reads through three narrow
//! collaborator traits defined in [`source`]:
//!
//! 1. `ConfigSource`: runtime feature flags (`auto_refresh_cookie`)
//! 2. `AccountSource`: the ordered account list plus the per-index state overlay
//! 3. `CredentialSink`: write-back of a refreshed session cookie
//!
//! `AccountStore` is the in-process implementation used by the service binary:
//! a JSON document on disk for accounts and settings, and an in-memory overlay
//! map that other components flip when a cookie is observed to be expired.

pub mod account;
pub mod error;
pub mod source;
pub mod store;

pub use account::{Account, AccountState, is_effectively_expired};
pub use error::{Error, Result};
pub use source::{AUTO_REFRESH_COOKIE, AccountSource, ConfigSource, CredentialSink};
pub use store::AccountStore;
