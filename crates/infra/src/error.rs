use thiserror::Error;

use credo_auth::{IssuanceError, StorageUnavailable};

/// Store operation error.
///
/// These are infrastructure errors only. "Not found" is never an error at this
/// layer; lookups return `Option`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint (opaque value, username, email) was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Connection, pool, or driver failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row could not be mapped back into a domain record.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for StorageUnavailable {
    fn from(err: StoreError) -> Self {
        StorageUnavailable::new(err.to_string())
    }
}

impl From<StoreError> for IssuanceError {
    fn from(err: StoreError) -> Self {
        IssuanceError::Storage(err.into())
    }
}
