//! Error types for download negotiation.

use thiserror::Error;

use crate::account::AccountError;
use crate::token::TokenError;

/// Code carried by every RPC error reply.
pub const RPC_ERROR_CODE: i32 = -1;

/// Errors the negotiator reports to callers.
///
/// A platform or version miss on the interactive path is not an error; it
/// becomes a manual-install fallback. These variants are the failures that
/// reach the RPC caller or the error page.
#[derive(Debug, Error)]
pub enum NegotiateError {
    #[error("RPC key mismatch")]
    RpcKeyMismatch,

    #[error("user not found")]
    UserNotFound,

    #[error("no project ID")]
    NoProjectId,

    #[error("no version for platform")]
    NoVersionForPlatform,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Account(#[from] AccountError),
}

impl NegotiateError {
    /// Numeric code for the RPC error document.
    #[must_use]
    pub fn code(&self) -> i32 {
        RPC_ERROR_CODE
    }

    /// Message for the RPC error document. Store details stay in the logs.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Token(_) | Self::Account(_) if self.is_transient() => {
                "temporarily unavailable; try again".to_string()
            }
            Self::Token(_) | Self::Account(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// True when retrying the same request later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Token(err) => err.is_transient(),
            Self::Account(err) => err.is_transient(),
            _ => false,
        }
    }
}
