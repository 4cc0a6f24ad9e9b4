//! Error types for account and consent lookups.

use thiserror::Error;

use crate::db::StoreErrorKind;
use crate::deadline::Elapsed;

/// Errors from the account directory or consent ledger.
///
/// A missing account is not an error; lookups return `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum AccountError {
    /// The backing store failed.
    #[error("account store error ({kind}): {message}")]
    Storage {
        /// Typed classification of the failure.
        kind: StoreErrorKind,
        /// Human-readable driver error text.
        message: String,
    },

    /// The lookup did not finish before the request deadline.
    #[error("account lookup timed out during {operation}")]
    Timeout {
        /// Operation that was cut off.
        operation: &'static str,
    },
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage {
            kind: StoreErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl From<Elapsed> for AccountError {
    fn from(elapsed: Elapsed) -> Self {
        Self::Timeout {
            operation: elapsed.operation,
        }
    }
}

impl AccountError {
    /// Returns the typed store error kind, when this is a storage error.
    #[must_use]
    pub fn storage_kind(&self) -> Option<StoreErrorKind> {
        match self {
            Self::Storage { kind, .. } => Some(*kind),
            Self::Timeout { .. } => None,
        }
    }

    /// Returns true when the same call may succeed later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Storage { kind, .. } => kind.is_transient(),
        }
    }
}
