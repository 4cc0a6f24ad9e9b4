//! User-visible classification of negotiation and consent outcomes.

use crate::catalog::CatalogError;
use crate::consent::ConsentError;
use crate::negotiate::{NegotiateError, PortalResponse};

/// How an outcome is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResponseClass {
    /// Normal page, including the manual-install fallback.
    Informational,
    /// Explicit error page; retrying the same request will not help.
    ErrorPage,
    /// Temporary failure; the same request may succeed later.
    TryAgain,
}

impl ResponseClass {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::ErrorPage => "error",
            Self::TryAgain => "try_again",
        }
    }

    /// Process exit code the CLI uses for this class.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Informational => 0,
            Self::ErrorPage => 1,
            Self::TryAgain => 75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub class: ResponseClass,
    pub what: &'static str,
    pub fix: &'static str,
}

const TRY_AGAIN: Descriptor = Descriptor {
    class: ResponseClass::TryAgain,
    what: "Service temporarily unavailable",
    fix: "Wait a moment and try again.",
};

const STORE_FAILURE: Descriptor = Descriptor {
    class: ResponseClass::ErrorPage,
    what: "Internal storage error",
    fix: "Contact the site administrators.",
};

/// Successful responses are always informational, fallbacks included.
#[must_use]
pub fn classify_response(response: &PortalResponse) -> Descriptor {
    let what = match response {
        PortalResponse::Offer(_) => "Download ready",
        PortalResponse::Manual(_) => "Download from the public download page",
        PortalResponse::Installed(_) => "Client already installed",
        PortalResponse::Descriptor(_) => "Download information issued",
    };
    Descriptor {
        class: ResponseClass::Informational,
        what,
        fix: "",
    }
}

#[must_use]
pub fn classify_negotiate(error: &NegotiateError) -> Descriptor {
    match error {
        NegotiateError::RpcKeyMismatch => Descriptor {
            class: ResponseClass::ErrorPage,
            what: "RPC key mismatch",
            fix: "Use the RPC key configured for this project.",
        },
        NegotiateError::UserNotFound => Descriptor {
            class: ResponseClass::ErrorPage,
            what: "Account not found",
            fix: "Check the account authenticator.",
        },
        NegotiateError::NoProjectId => Descriptor {
            class: ResponseClass::ErrorPage,
            what: "Project has no project ID",
            fix: "Set `project_id` in the portal configuration.",
        },
        NegotiateError::NoVersionForPlatform => Descriptor {
            class: ResponseClass::ErrorPage,
            what: "No client version for this platform",
            fix: "Download the client from the public download page.",
        },
        NegotiateError::Token(_) | NegotiateError::Account(_) if error.is_transient() => TRY_AGAIN,
        NegotiateError::Token(_) | NegotiateError::Account(_) => STORE_FAILURE,
    }
}

#[must_use]
pub fn classify_consent(error: &ConsentError) -> Descriptor {
    match error {
        ConsentError::NotAgreed => Descriptor {
            class: ResponseClass::ErrorPage,
            what: "Terms of use not accepted",
            fix: "You may not continue until you agree to the terms of use.",
        },
        ConsentError::MissingCookie { .. }
        | ConsentError::InvalidAccountId
        | ConsentError::AuthenticationFailed
        | ConsentError::AccountNotFound(_) => Descriptor {
            class: ResponseClass::ErrorPage,
            what: "Authentication error attempting to agree to terms of use",
            fix: "Log in again to restart the consent step.",
        },
        ConsentError::ConsentTypeMissing | ConsentError::InvalidMasterUrl(_) => Descriptor {
            class: ResponseClass::ErrorPage,
            what: "Consent step is misconfigured",
            fix: "Contact the site administrators.",
        },
        ConsentError::Token(_) | ConsentError::Account(_) if error.is_transient() => TRY_AGAIN,
        ConsentError::Token(_) | ConsentError::Account(_) => STORE_FAILURE,
    }
}

#[must_use]
pub fn classify_catalog(error: &CatalogError) -> Descriptor {
    if error.is_transient() {
        return Descriptor {
            class: ResponseClass::TryAgain,
            what: "Version feed unreachable",
            fix: "Check connectivity to the feed URL and retry.",
        };
    }
    Descriptor {
        class: ResponseClass::ErrorPage,
        what: "Version feed rejected",
        fix: "Inspect the feed document; the previous catalog stays in use.",
    }
}
