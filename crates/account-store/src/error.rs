//! Error types for account store operations

/// Errors from account and settings access.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("account file parse error: {0}")]
    Parse(String),

    #[error("account not found: {0}")]
    NotFound(usize),

    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for account store operations.
pub type Result<T> = std::result::Result<T, Error>;
