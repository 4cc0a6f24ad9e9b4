//! Single-use, typed, expiring tokens.
//!
//! A token is a random identifier bound to one account and one purpose. The
//! caller receives the identifier once; the store keeps only its SHA-256
//! digest. Expiry is derived from the token type at check time, so changing a
//! lifetime applies to tokens already issued.
//!
//! Redemption goes through [`TokenAuthority::validate_and_consume`], which is
//! a single conditional delete in the store: of several concurrent callers
//! presenting the same token, exactly one sees `true`.

mod clock;
mod error;
mod kind;
mod memory;
mod store;
mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TokenError;
pub use kind::{
    DEFAULT_DOWNLOAD_AUTHORIZATION_LIFETIME, DEFAULT_LOGIN_INTERCEPT_LIFETIME, TokenLifetimes,
    TokenType,
};
pub use memory::MemoryTokenStore;
pub use store::{SqliteTokenStore, TokenKey, TokenRecord, TokenStore};
pub use sweep::spawn_sweeper;

use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::account::AccountId;
use crate::deadline::Deadline;

/// Number of random bytes in a token identifier.
const TOKEN_BYTES: usize = 32;

/// A token identifier as handed to (or presented by) a client.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenId(String);

impl TokenId {
    fn generate() -> Self {
        let mut bytes = [0_u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex_encode(&bytes))
    }

    /// Wraps an identifier received from a client.
    #[must_use]
    pub fn presented(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The identifier itself, for placing into a form field, cookie, or reply.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn digest(&self) -> String {
        hex_encode(&Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenId(<redacted>)")
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

/// Issues, checks, and redeems tokens against a [`TokenStore`].
#[derive(Clone)]
pub struct TokenAuthority {
    store: Arc<dyn TokenStore>,
    lifetimes: TokenLifetimes,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("lifetimes", &self.lifetimes)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Creates an authority with default lifetimes and the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            lifetimes: TokenLifetimes::default(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    fn key(account_id: AccountId, token: &TokenId, token_type: TokenType) -> TokenKey {
        TokenKey {
            digest: token.digest(),
            account_id,
            token_type,
        }
    }

    fn cutoff(&self, token_type: TokenType) -> i64 {
        self.lifetimes
            .expiry_cutoff(token_type, self.clock.now_unix())
    }

    /// Mints a new token for `account_id`.
    ///
    /// Not retried on failure; a caller that sees an error has no token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if the store fails or the deadline passes.
    #[instrument(skip(self, deadline), fields(account_id = %account_id, token_type = %token_type))]
    pub async fn issue(
        &self,
        account_id: AccountId,
        token_type: TokenType,
        deadline: &Deadline,
    ) -> Result<TokenId, TokenError> {
        let token = TokenId::generate();
        let record = TokenRecord {
            key: Self::key(account_id, &token, token_type),
            issued_at: self.clock.now_unix(),
        };
        deadline
            .run("issue", self.store.insert(&record))
            .await??;
        debug!("Token issued");
        Ok(token)
    }

    /// Checks a token without consuming it.
    ///
    /// Unknown, expired, or wrongly-scoped tokens answer `false`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] only if the store cannot answer.
    #[instrument(skip(self, token, deadline), fields(account_id = %account_id, token_type = %token_type))]
    pub async fn validate(
        &self,
        account_id: AccountId,
        token: &TokenId,
        token_type: TokenType,
        deadline: &Deadline,
    ) -> Result<bool, TokenError> {
        let key = Self::key(account_id, token, token_type);
        let cutoff = self.cutoff(token_type);
        let valid = deadline
            .run("validate", self.store.exists_unexpired(&key, cutoff))
            .await??;
        Ok(valid)
    }

    /// Deletes a token regardless of expiry. Deleting a missing token succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if the store fails or the deadline passes.
    #[instrument(skip(self, token, deadline), fields(account_id = %account_id, token_type = %token_type))]
    pub async fn invalidate(
        &self,
        account_id: AccountId,
        token: &TokenId,
        token_type: TokenType,
        deadline: &Deadline,
    ) -> Result<(), TokenError> {
        let key = Self::key(account_id, token, token_type);
        let existed = deadline
            .run("invalidate", self.store.delete(&key))
            .await??;
        debug!(existed, "Token invalidated");
        Ok(())
    }

    /// Redeems a token: true iff it was live and this call removed it.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if the store fails or the deadline passes. The
    /// token is then in an unknown state; the caller must not treat it as redeemed.
    #[instrument(skip(self, token, deadline), fields(account_id = %account_id, token_type = %token_type))]
    pub async fn validate_and_consume(
        &self,
        account_id: AccountId,
        token: &TokenId,
        token_type: TokenType,
        deadline: &Deadline,
    ) -> Result<bool, TokenError> {
        let key = Self::key(account_id, token, token_type);
        let cutoff = self.cutoff(token_type);
        let consumed = deadline
            .run(
                "validate_and_consume",
                self.store.consume_unexpired(&key, cutoff),
            )
            .await??;
        debug!(consumed, "Token redemption attempted");
        Ok(consumed)
    }

    /// Deletes every expired token of every type and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] on the first failing store call.
    #[instrument(skip(self, deadline))]
    pub async fn sweep_expired(&self, deadline: &Deadline) -> Result<u64, TokenError> {
        let mut removed = 0_u64;
        for token_type in TokenType::ALL {
            let cutoff = self.cutoff(token_type);
            removed += deadline
                .run(
                    "sweep_expired",
                    self.store.delete_expired(token_type, cutoff),
                )
                .await??;
        }
        if removed > 0 {
            info!(removed, "Expired tokens swept");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    const START: i64 = 1_700_000_000;

    fn authority() -> (TokenAuthority, Arc<MemoryTokenStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryTokenStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let authority = TokenAuthority::new(store.clone()).with_clock(clock.clone());
        (authority, store, clock)
    }

    #[test]
    fn test_generated_ids_are_64_lower_hex() {
        let token = TokenId::generate();
        assert_eq!(token.expose().len(), 64);
        assert!(
            token
                .expose()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
        assert_ne!(token, TokenId::generate());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = TokenId::presented("abcdef");
        assert!(!format!("{token:?}").contains("abcdef"));
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        let token = TokenId::presented("abc");
        assert_eq!(
            token.digest(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_issue_then_validate() {
        let (authority, _, _) = authority();
        let account = AccountId::new(5);
        let token = authority
            .issue(account, TokenType::DownloadAuthorization, &Deadline::none())
            .await
            .unwrap();

        assert!(
            authority
                .validate(
                    account,
                    &token,
                    TokenType::DownloadAuthorization,
                    &Deadline::none()
                )
                .await
                .unwrap()
        );
        // Validation does not consume.
        assert!(
            authority
                .validate(
                    account,
                    &token,
                    TokenType::DownloadAuthorization,
                    &Deadline::none()
                )
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_wrong_type_or_account_is_invalid() {
        let (authority, _, _) = authority();
        let token = authority
            .issue(
                AccountId::new(5),
                TokenType::LoginIntercept,
                &Deadline::none(),
            )
            .await
            .unwrap();

        assert!(
            !authority
                .validate(
                    AccountId::new(5),
                    &token,
                    TokenType::DownloadAuthorization,
                    &Deadline::none()
                )
                .await
                .unwrap()
        );
        assert!(
            !authority
                .validate_and_consume(
                    AccountId::new(6),
                    &token,
                    TokenType::LoginIntercept,
                    &Deadline::none()
                )
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let (authority, _, clock) = authority();
        let account = AccountId::new(1);
        let token = authority
            .issue(account, TokenType::LoginIntercept, &Deadline::none())
            .await
            .unwrap();

        clock.advance(Duration::from_secs(3599));
        assert!(
            authority
                .validate(account, &token, TokenType::LoginIntercept, &Deadline::none())
                .await
                .unwrap()
        );

        clock.advance(Duration::from_secs(1));
        assert!(
            !authority
                .validate(account, &token, TokenType::LoginIntercept, &Deadline::none())
                .await
                .unwrap()
        );
        assert!(
            !authority
                .validate_and_consume(account, &token, TokenType::LoginIntercept, &Deadline::none())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let (authority, store, _) = authority();
        let account = AccountId::new(2);
        let token = authority
            .issue(account, TokenType::LoginIntercept, &Deadline::none())
            .await
            .unwrap();

        let first = authority
            .validate_and_consume(account, &token, TokenType::LoginIntercept, &Deadline::none())
            .await
            .unwrap();
        let second = authority
            .validate_and_consume(account, &token, TokenType::LoginIntercept, &Deadline::none())
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let (authority, _, _) = authority();
        let account = AccountId::new(3);
        let token = authority
            .issue(account, TokenType::DownloadAuthorization, &Deadline::none())
            .await
            .unwrap();

        for _ in 0..2 {
            authority
                .invalidate(
                    account,
                    &token,
                    TokenType::DownloadAuthorization,
                    &Deadline::none(),
                )
                .await
                .unwrap();
        }
        assert!(
            !authority
                .validate(
                    account,
                    &token,
                    TokenType::DownloadAuthorization,
                    &Deadline::none()
                )
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_sweep_uses_per_type_lifetimes() {
        let (authority, store, clock) = authority();
        let account = AccountId::new(4);
        authority
            .issue(account, TokenType::LoginIntercept, &Deadline::none())
            .await
            .unwrap();
        authority
            .issue(account, TokenType::DownloadAuthorization, &Deadline::none())
            .await
            .unwrap();

        clock.advance(Duration::from_secs(2 * 3600));
        assert_eq!(authority.sweep_expired(&Deadline::none()).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[derive(Debug)]
    struct StalledStore;

    #[async_trait]
    impl TokenStore for StalledStore {
        async fn insert(&self, _record: &TokenRecord) -> Result<(), TokenError> {
            std::future::pending().await
        }
        async fn exists_unexpired(&self, _key: &TokenKey, _after: i64) -> Result<bool, TokenError> {
            std::future::pending().await
        }
        async fn delete(&self, _key: &TokenKey) -> Result<bool, TokenError> {
            std::future::pending().await
        }
        async fn consume_unexpired(
            &self,
            _key: &TokenKey,
            _after: i64,
        ) -> Result<bool, TokenError> {
            std::future::pending().await
        }
        async fn delete_expired(&self, _t: TokenType, _cutoff: i64) -> Result<u64, TokenError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out() {
        let authority = TokenAuthority::new(Arc::new(StalledStore));
        let deadline = Deadline::after(Duration::from_millis(100));

        let err = authority
            .validate_and_consume(
                AccountId::new(1),
                &TokenId::presented("x"),
                TokenType::LoginIntercept,
                &deadline,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TokenError::Timeout {
                operation: "validate_and_consume"
            }
        ));
        assert!(err.is_transient());
    }
}
