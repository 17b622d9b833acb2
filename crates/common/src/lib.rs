//! Shared types for the cookie refresh workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
