//! Token purposes and their lifetimes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default lifetime of a download-authorization token.
pub const DEFAULT_DOWNLOAD_AUTHORIZATION_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Default lifetime of a login-intercept token.
pub const DEFAULT_LOGIN_INTERCEPT_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Purpose a token was issued for. A token is only ever valid for its own type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Authorizes the delivery service to release a client download.
    DownloadAuthorization,
    /// Bridges an external consent page back into a session.
    LoginIntercept,
}

impl TokenType {
    pub const ALL: [Self; 2] = [Self::DownloadAuthorization, Self::LoginIntercept];

    /// Returns the database/wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DownloadAuthorization => "download_authorization",
            Self::LoginIntercept => "login_intercept",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download_authorization" => Ok(Self::DownloadAuthorization),
            "login_intercept" => Ok(Self::LoginIntercept),
            other => Err(format!("unknown token type: {other}")),
        }
    }
}

/// Per-type token lifetimes.
///
/// Expiry is derived at check time: a token is expired once
/// `now - issued_at >= lifetime(type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub download_authorization: Duration,
    pub login_intercept: Duration,
}

impl TokenLifetimes {
    #[must_use]
    pub fn lifetime(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::DownloadAuthorization => self.download_authorization,
            TokenType::LoginIntercept => self.login_intercept,
        }
    }

    /// Tokens of `token_type` issued at or before the returned unix second are expired at `now`.
    #[must_use]
    pub fn expiry_cutoff(&self, token_type: TokenType, now: i64) -> i64 {
        let lifetime = i64::try_from(self.lifetime(token_type).as_secs()).unwrap_or(i64::MAX);
        now.saturating_sub(lifetime)
    }
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            download_authorization: DEFAULT_DOWNLOAD_AUTHORIZATION_LIFETIME,
            login_intercept: DEFAULT_LOGIN_INTERCEPT_LIFETIME,
        }
    }
}
