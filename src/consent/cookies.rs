//! Cookies exchanged during the consent handoff.

use std::fmt;

use serde::Serialize;

/// Single-use login-intercept token.
pub const LOGIN_TOKEN_COOKIE: &str = "logintoken";

/// Account the pending handoff belongs to.
pub const TEMP_USER_ID_COOKIE: &str = "tempuserid";

/// Present when the session should outlive the browser.
pub const TEMP_PERM_COOKIE: &str = "tempperm";

/// Session cookie carrying the account authenticator.
pub const SESSION_COOKIE: &str = "auth";

/// How long a cookie directive keeps its cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieLifetime {
    /// Dropped when the browser closes.
    Session,
    /// Long-lived.
    Permanent,
    /// Expires the cookie immediately.
    Cleared,
}

/// One `Set-Cookie` the caller must emit.
///
/// The value is redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CookieDirective {
    pub name: &'static str,
    value: String,
    pub lifetime: CookieLifetime,
}

impl CookieDirective {
    #[must_use]
    pub fn set(name: &'static str, value: impl Into<String>, permanent: bool) -> Self {
        Self {
            name,
            value: value.into(),
            lifetime: if permanent {
                CookieLifetime::Permanent
            } else {
                CookieLifetime::Session
            },
        }
    }

    #[must_use]
    pub fn clear(name: &'static str) -> Self {
        Self {
            name,
            value: String::new(),
            lifetime: CookieLifetime::Cleared,
        }
    }

    /// The cookie value. Treat as a credential.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for CookieDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieDirective")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Handoff cookies presented by the browser.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConsentCookies {
    pub logintoken: Option<String>,
    pub tempuserid: Option<String>,
    pub tempperm: Option<String>,
}

impl fmt::Debug for ConsentCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentCookies")
            .field("logintoken", &self.logintoken.as_ref().map(|_| "[REDACTED]"))
            .field("tempuserid", &self.tempuserid)
            .field("tempperm", &self.tempperm)
            .finish()
    }
}

impl ConsentCookies {
    /// Picks the handoff cookies out of a `Cookie` request header.
    ///
    /// Unrelated cookies are ignored; the first occurrence of a name wins.
    #[must_use]
    pub fn from_header(header: &str) -> Self {
        let mut cookies = Self::default();
        for pair in header.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let slot = match name.trim() {
                LOGIN_TOKEN_COOKIE => &mut cookies.logintoken,
                TEMP_USER_ID_COOKIE => &mut cookies.tempuserid,
                TEMP_PERM_COOKIE => &mut cookies.tempperm,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.trim().to_string());
            }
        }
        cookies
    }

    /// True when `tempperm` holds a truthy value.
    #[must_use]
    pub fn wants_permanent(&self) -> bool {
        self.tempperm.as_deref().is_some_and(is_truthy)
    }
}

/// Form-style truthiness: present, non-empty, and not `"0"`.
pub(crate) fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "0"
}
