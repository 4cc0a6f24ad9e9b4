//! Minimal account and consent views.
//!
//! Accounts and consent records are owned by the wider portal. This module
//! only reads accounts (by authenticator or id), looks up consent types, and
//! appends consent acceptance rows.
//!
//! - [`AccountDirectory`] - read-only account lookups
//! - [`ConsentLedger`] - consent type lookup and acceptance recording
//! - [`SqliteDirectory`] - `SQLite` implementation of both seams

mod error;
mod sqlite;

pub use error::AccountError;
pub use sqlite::SqliteDirectory;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Short name of the terms-of-use consent type.
pub const CONSENT_TYPE_ENROLL: &str = "ENROLL";

/// Source recorded for consents given through the web form.
pub const CONSENT_SOURCE_WEBFORM: &str = "Webform";

/// Opaque account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = String;

    /// Parses a positive decimal id, as carried in cookies and form fields.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(format!("invalid account id: {s}")),
        }
    }
}

/// Read-only account view.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Account {
    #[sqlx(try_from = "i64")]
    pub id: AccountId,
    /// Long-lived credential that establishes a session. Never logged.
    pub authenticator: String,
    pub name: String,
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A named consent type and whether it is currently in force.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ConsentType {
    pub id: i64,
    pub short_name: String,
    pub enabled: bool,
}

/// One consent acceptance event to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConsent<'a> {
    pub account_id: AccountId,
    pub consent_type_id: i64,
    pub consent_flag: bool,
    pub consent_not_required: bool,
    pub source: &'a str,
    /// Unix seconds.
    pub consent_time: i64,
}

/// Read-only account lookups.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Finds the account owning `authenticator`.
    async fn lookup_by_authenticator(
        &self,
        authenticator: &str,
    ) -> Result<Option<Account>, AccountError>;

    /// Finds an account by id, bypassing any cache.
    async fn lookup_by_id(&self, id: AccountId) -> Result<Option<Account>, AccountError>;
}

/// Consent type lookup and acceptance recording.
#[async_trait]
pub trait ConsentLedger: Send + Sync {
    /// Finds an enabled consent type by short name.
    async fn find_consent_type(&self, short_name: &str)
    -> Result<Option<ConsentType>, AccountError>;

    /// Appends one acceptance row and returns its id.
    async fn record_consent(&self, consent: &NewConsent<'_>) -> Result<i64, AccountError>;
}
