//! Error types for the consent handoff.

use thiserror::Error;

use crate::account::{AccountError, AccountId};
use crate::token::TokenError;

/// Reasons a consent submission is rejected.
#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("terms of use were not accepted")]
    NotAgreed,

    #[error("handoff cookie `{name}` is missing")]
    MissingCookie { name: &'static str },

    #[error("handoff cookie `tempuserid` is not a valid account id")]
    InvalidAccountId,

    /// The login token was unknown, expired, already used, or belongs to another account.
    #[error("authentication error attempting to agree to terms of use")]
    AuthenticationFailed,

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("consent type for enrollment not found")]
    ConsentTypeMissing,

    #[error("master URL is not a valid redirect base: {0}")]
    InvalidMasterUrl(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Account(#[from] AccountError),
}

impl ConsentError {
    /// True when retrying later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Token(err) => err.is_transient(),
            Self::Account(err) => err.is_transient(),
            _ => false,
        }
    }
}
