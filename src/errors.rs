//! Crate-wide error types.

use thiserror::Error;

/// Errors raised by configuration loading and the inventory store.
#[derive(Debug, Error)]
pub enum PantryError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

pub type PantryResult<T> = Result<T, PantryError>;
