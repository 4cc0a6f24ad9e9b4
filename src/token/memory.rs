//! In-process token store.
//!
//! Useful for tests and single-node deployments without a database file.
//! Rows do not survive a restart.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{TokenError, TokenKey, TokenRecord, TokenStore, TokenType};

/// Token store backed by a concurrent map keyed by [`TokenKey`].
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    rows: DashMap<TokenKey, i64>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, record: &TokenRecord) -> Result<(), TokenError> {
        self.rows.insert(record.key.clone(), record.issued_at);
        Ok(())
    }

    async fn exists_unexpired(
        &self,
        key: &TokenKey,
        issued_after: i64,
    ) -> Result<bool, TokenError> {
        Ok(self
            .rows
            .get(key)
            .is_some_and(|issued_at| *issued_at > issued_after))
    }

    async fn delete(&self, key: &TokenKey) -> Result<bool, TokenError> {
        Ok(self.rows.remove(key).is_some())
    }

    async fn consume_unexpired(
        &self,
        key: &TokenKey,
        issued_after: i64,
    ) -> Result<bool, TokenError> {
        // remove_if holds the shard lock across the check.
        Ok(self
            .rows
            .remove_if(key, |_, issued_at| *issued_at > issued_after)
            .is_some())
    }

    async fn delete_expired(&self, token_type: TokenType, cutoff: i64) -> Result<u64, TokenError> {
        let mut removed = 0_u64;
        self.rows.retain(|key, issued_at| {
            let keep = key.token_type != token_type || *issued_at > cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
