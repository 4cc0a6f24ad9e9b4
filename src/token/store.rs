//! Persistence seam for single-use tokens.

use async_trait::async_trait;
use tracing::instrument;

use crate::account::AccountId;
use crate::db::Database;

use super::{TokenError, TokenType};

/// Identifies one stored token: digest of the identifier plus its scope.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    /// Lower-case hex SHA-256 of the token identifier.
    pub digest: String,
    pub account_id: AccountId,
    pub token_type: TokenType,
}

impl std::fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKey")
            .field("digest", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// A token row as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub key: TokenKey,
    /// Unix seconds.
    pub issued_at: i64,
}

/// Storage contract for the token authority.
///
/// `issued_after` arguments are expiry cutoffs: a row is live iff its
/// `issued_at` is strictly greater.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persists a freshly issued token.
    async fn insert(&self, record: &TokenRecord) -> Result<(), TokenError>;

    /// Returns true if a live row matches `key`. Never mutates.
    async fn exists_unexpired(&self, key: &TokenKey, issued_after: i64)
    -> Result<bool, TokenError>;

    /// Deletes any row matching `key`, live or not. Returns whether one existed.
    async fn delete(&self, key: &TokenKey) -> Result<bool, TokenError>;

    /// Atomically deletes a live row matching `key`.
    ///
    /// Returns true for exactly one caller when several race on the same key.
    async fn consume_unexpired(
        &self,
        key: &TokenKey,
        issued_after: i64,
    ) -> Result<bool, TokenError>;

    /// Deletes every row of `token_type` issued at or before `cutoff`.
    async fn delete_expired(&self, token_type: TokenType, cutoff: i64) -> Result<u64, TokenError>;
}

/// `SQLite` token store over the `tokens` table.
#[derive(Debug, Clone)]
pub struct SqliteTokenStore {
    db: Database,
}

impl SqliteTokenStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Counts stored rows of one type, live or expired.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Storage`] if the query fails.
    pub async fn count_by_type(&self, token_type: TokenType) -> Result<i64, TokenError> {
        let count: (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM tokens WHERE token_type = ?")
            .bind(token_type.as_str())
            .fetch_one(self.db.pool())
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    #[instrument(skip(self, record), fields(account_id = %record.key.account_id, token_type = %record.key.token_type))]
    async fn insert(&self, record: &TokenRecord) -> Result<(), TokenError> {
        sqlx::query(
            r"INSERT INTO tokens (token_hash, account_id, token_type, issued_at)
              VALUES (?, ?, ?, ?)",
        )
        .bind(&record.key.digest)
        .bind(record.key.account_id.get())
        .bind(record.key.token_type.as_str())
        .bind(record.issued_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    #[instrument(skip(self, key), fields(account_id = %key.account_id, token_type = %key.token_type))]
    async fn exists_unexpired(
        &self,
        key: &TokenKey,
        issued_after: i64,
    ) -> Result<bool, TokenError> {
        let found: Option<(i64,)> = sqlx::query_as(
            r"SELECT 1 FROM tokens
              WHERE token_hash = ?
                AND account_id = ?
                AND token_type = ?
                AND issued_at > ?",
        )
        .bind(&key.digest)
        .bind(key.account_id.get())
        .bind(key.token_type.as_str())
        .bind(issued_after)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, key), fields(account_id = %key.account_id, token_type = %key.token_type))]
    async fn delete(&self, key: &TokenKey) -> Result<bool, TokenError> {
        let result = sqlx::query(
            r"DELETE FROM tokens
              WHERE token_hash = ? AND account_id = ? AND token_type = ?",
        )
        .bind(&key.digest)
        .bind(key.account_id.get())
        .bind(key.token_type.as_str())
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, key), fields(account_id = %key.account_id, token_type = %key.token_type))]
    async fn consume_unexpired(
        &self,
        key: &TokenKey,
        issued_after: i64,
    ) -> Result<bool, TokenError> {
        // Single statement: the check and the delete cannot interleave with another consumer.
        let consumed: Option<(String,)> = sqlx::query_as(
            r"DELETE FROM tokens
              WHERE token_hash = ?
                AND account_id = ?
                AND token_type = ?
                AND issued_at > ?
              RETURNING token_hash",
        )
        .bind(&key.digest)
        .bind(key.account_id.get())
        .bind(key.token_type.as_str())
        .bind(issued_after)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(consumed.is_some())
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self, token_type: TokenType, cutoff: i64) -> Result<u64, TokenError> {
        let result = sqlx::query(r"DELETE FROM tokens WHERE token_type = ? AND issued_at <= ?")
            .bind(token_type.as_str())
            .bind(cutoff)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
