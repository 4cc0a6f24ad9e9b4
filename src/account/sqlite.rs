//! `SQLite`-backed account directory and consent ledger.

use async_trait::async_trait;
use tracing::instrument;

use crate::db::Database;

use super::{
    Account, AccountDirectory, AccountError, AccountId, ConsentLedger, ConsentType, NewConsent,
};

/// Account and consent access over the portal database.
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    db: Database,
}

impl SqliteDirectory {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts an account and returns its id.
    ///
    /// Account management lives elsewhere; this exists for provisioning and tests.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Storage`] if the insert fails (including a duplicate authenticator).
    #[instrument(skip(self, authenticator))]
    pub async fn create_account(
        &self,
        name: &str,
        authenticator: &str,
    ) -> Result<AccountId, AccountError> {
        let id: (i64,) =
            sqlx::query_as(r"INSERT INTO accounts (authenticator, name) VALUES (?, ?) RETURNING id")
                .bind(authenticator)
                .bind(name)
                .fetch_one(self.db.pool())
                .await?;
        Ok(AccountId::new(id.0))
    }

    /// Counts recorded consents for an account and consent type.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Storage`] if the query fails.
    pub async fn count_consents(
        &self,
        account_id: AccountId,
        consent_type_id: i64,
    ) -> Result<i64, AccountError> {
        let count: (i64,) = sqlx::query_as(
            r"SELECT COUNT(*) FROM consents WHERE account_id = ? AND consent_type_id = ?",
        )
        .bind(account_id.get())
        .bind(consent_type_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl AccountDirectory for SqliteDirectory {
    #[instrument(skip(self, authenticator))]
    async fn lookup_by_authenticator(
        &self,
        authenticator: &str,
    ) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as::<_, Account>(
            r"SELECT id, authenticator, name FROM accounts WHERE authenticator = ?",
        )
        .bind(authenticator)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn lookup_by_id(&self, id: AccountId) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as::<_, Account>(
            r"SELECT id, authenticator, name FROM accounts WHERE id = ?",
        )
        .bind(id.get())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(account)
    }
}

#[async_trait]
impl ConsentLedger for SqliteDirectory {
    #[instrument(skip(self))]
    async fn find_consent_type(
        &self,
        short_name: &str,
    ) -> Result<Option<ConsentType>, AccountError> {
        let consent_type = sqlx::query_as::<_, ConsentType>(
            r"SELECT id, short_name, enabled FROM consent_types
              WHERE short_name = ? AND enabled = 1",
        )
        .bind(short_name)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(consent_type)
    }

    #[instrument(skip(self, consent), fields(account_id = %consent.account_id, consent_type_id = consent.consent_type_id))]
    async fn record_consent(&self, consent: &NewConsent<'_>) -> Result<i64, AccountError> {
        let id: (i64,) = sqlx::query_as(
            r"INSERT INTO consents (
                account_id,
                consent_type_id,
                consent_flag,
                consent_not_required,
                source,
                consent_time
              )
              VALUES (?, ?, ?, ?, ?, ?)
              RETURNING id",
        )
        .bind(consent.account_id.get())
        .bind(consent.consent_type_id)
        .bind(consent.consent_flag)
        .bind(consent.consent_not_required)
        .bind(consent.source)
        .bind(consent.consent_time)
        .fetch_one(self.db.pool())
        .await?;
        Ok(id.0)
    }
}
