//! Terms-of-use consent handoff.
//!
//! When login is intercepted for a consent step, the portal stores a
//! login-intercept token in the browser instead of a session. Accepting the
//! terms redeems that token exactly once, records the consent, and only then
//! hands out the session cookie.

mod cookies;
mod error;
mod next_url;

pub use cookies::{
    ConsentCookies, CookieDirective, CookieLifetime, LOGIN_TOKEN_COOKIE, SESSION_COOKIE,
    TEMP_PERM_COOKIE, TEMP_USER_ID_COOKIE,
};
pub use error::ConsentError;
pub use next_url::resolve_redirect;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use crate::account::{
    AccountDirectory, AccountError, AccountId, CONSENT_SOURCE_WEBFORM, CONSENT_TYPE_ENROLL,
    ConsentLedger, NewConsent,
};
use crate::config::PortalConfig;
use crate::deadline::Deadline;
use crate::token::{Clock, SystemClock, TokenAuthority, TokenId, TokenType};

/// Where a handoff stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffState {
    /// Intercept token issued, waiting for the user.
    Pending,
    /// Submission received, checks running.
    Validating,
    /// Consent recorded and session granted.
    Consented,
    /// Submission refused; no session granted.
    Rejected,
}

impl fmt::Display for HandoffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::Consented => "consented",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// A started handoff: the cookies to set before showing the terms page.
#[derive(Debug, Clone, Serialize)]
pub struct PendingHandoff {
    pub state: HandoffState,
    pub account_id: AccountId,
    pub cookies: Vec<CookieDirective>,
}

/// The posted terms-of-use form plus the browser's handoff cookies.
#[derive(Debug, Clone, Default)]
pub struct ConsentSubmission {
    /// Checkbox value; only a non-empty value other than `"0"` counts as agreement.
    pub agree_to_terms_of_use: Option<String>,
    pub next_url: Option<String>,
    pub cookies: ConsentCookies,
}

/// A completed handoff.
#[derive(Debug, Clone, Serialize)]
pub struct ConsentOutcome {
    pub state: HandoffState,
    pub account_id: AccountId,
    pub consent_id: i64,
    /// Session cookie first, then the cleared handoff cookies.
    pub cookies: Vec<CookieDirective>,
    pub redirect: Url,
}

impl ConsentOutcome {
    #[must_use]
    pub fn session_cookie(&self) -> Option<&CookieDirective> {
        self.cookies.iter().find(|cookie| cookie.name == SESSION_COOKIE)
    }
}

/// Runs the consent handoff against the token, account, and consent stores.
#[derive(Clone)]
pub struct ConsentHandoff {
    tokens: TokenAuthority,
    accounts: Arc<dyn AccountDirectory>,
    ledger: Arc<dyn ConsentLedger>,
    config: Arc<PortalConfig>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ConsentHandoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentHandoff")
            .field("tokens", &self.tokens)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConsentHandoff {
    #[must_use]
    pub fn new(
        tokens: TokenAuthority,
        accounts: Arc<dyn AccountDirectory>,
        ledger: Arc<dyn ConsentLedger>,
        config: Arc<PortalConfig>,
    ) -> Self {
        Self {
            tokens,
            accounts,
            ledger,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses `clock` for consent timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issues a login-intercept token for `account_id` and returns the cookies to set.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::Token`] if the token cannot be issued.
    #[instrument(skip(self, deadline), fields(account_id = %account_id))]
    pub async fn begin(
        &self,
        account_id: AccountId,
        permanent: bool,
        deadline: &Deadline,
    ) -> Result<PendingHandoff, ConsentError> {
        let token = self
            .tokens
            .issue(account_id, TokenType::LoginIntercept, deadline)
            .await?;

        let mut cookies = vec![
            CookieDirective::set(LOGIN_TOKEN_COOKIE, token.expose(), false),
            CookieDirective::set(TEMP_USER_ID_COOKIE, account_id.to_string(), false),
        ];
        if permanent {
            cookies.push(CookieDirective::set(TEMP_PERM_COOKIE, "1", false));
        }

        info!(state = %HandoffState::Pending, "Consent handoff started");
        Ok(PendingHandoff {
            state: HandoffState::Pending,
            account_id,
            cookies,
        })
    }

    /// Validates a consent submission and, if everything checks out, grants the session.
    ///
    /// The redirect is resolved first, then the login token is consumed before
    /// the account is read, so a replayed submission always fails
    /// authentication and a misconfigured master URL leaves the token intact.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsentError`] describing why the submission was rejected.
    /// On any error no session cookie is produced.
    #[instrument(skip(self, submission, deadline), fields(state = %HandoffState::Validating))]
    pub async fn complete(
        &self,
        submission: &ConsentSubmission,
        deadline: &Deadline,
    ) -> Result<ConsentOutcome, ConsentError> {
        let result = self.validate(submission, deadline).await;
        match &result {
            Ok(outcome) => info!(
                state = %HandoffState::Consented,
                account_id = %outcome.account_id,
                "Consent recorded; session granted"
            ),
            Err(error) => warn!(
                state = %HandoffState::Rejected,
                error = %error,
                transient = error.is_transient(),
                "Consent submission rejected"
            ),
        }
        result
    }

    async fn validate(
        &self,
        submission: &ConsentSubmission,
        deadline: &Deadline,
    ) -> Result<ConsentOutcome, ConsentError> {
        if !submission
            .agree_to_terms_of_use
            .as_deref()
            .is_some_and(cookies::is_truthy)
        {
            return Err(ConsentError::NotAgreed);
        }

        let cookies = &submission.cookies;
        let login_token = cookies
            .logintoken
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or(ConsentError::MissingCookie {
                name: LOGIN_TOKEN_COOKIE,
            })?;
        let account_id: AccountId = cookies
            .tempuserid
            .as_deref()
            .ok_or(ConsentError::MissingCookie {
                name: TEMP_USER_ID_COOKIE,
            })?
            .parse()
            .map_err(|_| ConsentError::InvalidAccountId)?;

        // Resolved before anything durable happens.
        let redirect = resolve_redirect(
            &self.config.master_url,
            submission.next_url.as_deref(),
            &self.config.home_page,
        )
        .ok_or_else(|| ConsentError::InvalidMasterUrl(self.config.master_url.clone()))?;

        let redeemed = self
            .tokens
            .validate_and_consume(
                account_id,
                &TokenId::presented(login_token),
                TokenType::LoginIntercept,
                deadline,
            )
            .await?;
        if !redeemed {
            return Err(ConsentError::AuthenticationFailed);
        }

        let account = deadline
            .run("lookup_by_id", self.accounts.lookup_by_id(account_id))
            .await
            .map_err(AccountError::from)??
            .ok_or(ConsentError::AccountNotFound(account_id))?;

        let consent_type = deadline
            .run(
                "find_consent_type",
                self.ledger.find_consent_type(CONSENT_TYPE_ENROLL),
            )
            .await
            .map_err(AccountError::from)??
            .ok_or(ConsentError::ConsentTypeMissing)?;

        let consent = NewConsent {
            account_id: account.id,
            consent_type_id: consent_type.id,
            consent_flag: true,
            consent_not_required: false,
            source: CONSENT_SOURCE_WEBFORM,
            consent_time: self.clock.now_unix(),
        };
        let consent_id = deadline
            .run("record_consent", self.ledger.record_consent(&consent))
            .await
            .map_err(AccountError::from)??;

        Ok(ConsentOutcome {
            state: HandoffState::Consented,
            account_id: account.id,
            consent_id,
            cookies: vec![
                CookieDirective::set(
                    SESSION_COOKIE,
                    account.authenticator,
                    cookies.wants_permanent(),
                ),
                CookieDirective::clear(LOGIN_TOKEN_COOKIE),
                CookieDirective::clear(TEMP_USER_ID_COOKIE),
                CookieDirective::clear(TEMP_PERM_COOKIE),
            ],
            redirect,
        })
    }
}
