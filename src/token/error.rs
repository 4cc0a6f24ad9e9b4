//! Error types for token operations.

use thiserror::Error;

use crate::db::StoreErrorKind;
use crate::deadline::Elapsed;

/// Errors from the token authority and its stores.
///
/// An unknown, expired, or already-consumed token is not an error: the
/// validate operations answer `false`. These variants cover only the store
/// being unable to answer.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("token store error ({kind}): {message}")]
    Storage {
        kind: StoreErrorKind,
        message: String,
    },

    #[error("token store timed out during {operation}")]
    Timeout { operation: &'static str },
}

impl From<sqlx::Error> for TokenError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage {
            kind: StoreErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl From<Elapsed> for TokenError {
    fn from(elapsed: Elapsed) -> Self {
        Self::Timeout {
            operation: elapsed.operation,
        }
    }
}

impl TokenError {
    /// Returns true when the same call may succeed later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Storage { kind, .. } => kind.is_transient(),
        }
    }
}
