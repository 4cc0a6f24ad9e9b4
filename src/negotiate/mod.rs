//! Download negotiation.
//!
//! Turns a portal request into one of four responses:
//!
//! - an interactive [`DownloadOffer`] carrying a fresh download-authorization token,
//! - a [`ManualInstall`] fallback when the simplified flow cannot be used,
//! - an [`InstalledNotice`] for users whose client is already installed,
//! - a machine-readable [`DownloadDescriptor`] on the RPC path.
//!
//! The fallback and installed notice never touch the token store.

mod error;
mod response;

pub use error::{NegotiateError, RPC_ERROR_CODE};
pub use response::{
    ActionKind, AttachInstructions, CompanionPackageInfo, DownloadAction, DownloadDescriptor,
    DownloadOffer, InstalledNotice, ManualInstall, PackageInfo, RpcError, RpcReply, VboxAdvice,
    VboxRequirement, VboxSource,
};

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::account::{AccountDirectory, AccountError, AccountId};
use crate::catalog::{CatalogHandle, VersionEntry, select};
use crate::config::PortalConfig;
use crate::deadline::Deadline;
use crate::platform::{self, PlatformId};
use crate::token::{TokenAuthority, TokenType};

/// A request reaching the negotiator.
#[derive(Clone, PartialEq, Eq)]
pub enum PortalRequest {
    /// A logged-in user opened the download page.
    Offer {
        account_id: AccountId,
        user_agent: String,
        prefer_dev: bool,
    },
    /// The user says the client is already installed.
    InstalledNotice,
    /// Machine-readable download information.
    RpcGetInfo {
        rpc_key: Option<String>,
        authenticator: String,
        user_agent: String,
    },
}

impl PortalRequest {
    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::InstalledNotice => "installed",
            Self::RpcGetInfo { .. } => "rpc_get_info",
        }
    }
}

impl fmt::Debug for PortalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer {
                account_id,
                user_agent,
                prefer_dev,
            } => f
                .debug_struct("Offer")
                .field("account_id", account_id)
                .field("user_agent", user_agent)
                .field("prefer_dev", prefer_dev)
                .finish(),
            Self::InstalledNotice => f.write_str("InstalledNotice"),
            Self::RpcGetInfo { user_agent, .. } => f
                .debug_struct("RpcGetInfo")
                .field("user_agent", user_agent)
                .finish_non_exhaustive(),
        }
    }
}

/// What the negotiator answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum PortalResponse {
    Offer(DownloadOffer),
    Manual(ManualInstall),
    Installed(InstalledNotice),
    Descriptor(DownloadDescriptor),
}

/// Orchestrates platform resolution, version selection, and token issue.
#[derive(Clone)]
pub struct DownloadNegotiator {
    catalog: Arc<CatalogHandle>,
    tokens: TokenAuthority,
    accounts: Arc<dyn AccountDirectory>,
    config: Arc<PortalConfig>,
}

impl fmt::Debug for DownloadNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadNegotiator")
            .field("catalog", &self.catalog)
            .field("tokens", &self.tokens)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DownloadNegotiator {
    #[must_use]
    pub fn new(
        catalog: Arc<CatalogHandle>,
        tokens: TokenAuthority,
        accounts: Arc<dyn AccountDirectory>,
        config: Arc<PortalConfig>,
    ) -> Self {
        Self {
            catalog,
            tokens,
            accounts,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Interactive requests fail only when the token store does. RPC requests
    /// also fail on key mismatch, unknown authenticator, missing project id,
    /// or no matching version; none of those touch the token store.
    #[instrument(skip(self, request, deadline), fields(request = request.kind()))]
    pub async fn handle(
        &self,
        request: PortalRequest,
        deadline: &Deadline,
    ) -> Result<PortalResponse, NegotiateError> {
        match request {
            PortalRequest::Offer {
                account_id,
                user_agent,
                prefer_dev,
            } => self
                .offer(account_id, &user_agent, prefer_dev, deadline)
                .await,
            PortalRequest::InstalledNotice => Ok(PortalResponse::Installed(self.installed_notice())),
            PortalRequest::RpcGetInfo {
                rpc_key,
                authenticator,
                user_agent,
            } => self
                .rpc_get_info(rpc_key.as_deref(), &authenticator, &user_agent, deadline)
                .await
                .map(PortalResponse::Descriptor),
        }
    }

    async fn offer(
        &self,
        account_id: AccountId,
        user_agent: &str,
        prefer_dev: bool,
        deadline: &Deadline,
    ) -> Result<PortalResponse, NegotiateError> {
        let platform = platform::resolve(user_agent);
        let Some(project_id) = self.config.project_id else {
            debug!("No project id configured; manual install");
            return Ok(PortalResponse::Manual(self.manual_install(platform)));
        };
        let Some(platform) = platform.filter(|p| p.supports_simplified_install()) else {
            debug!(?platform, "Platform has no simplified install; manual install");
            return Ok(PortalResponse::Manual(self.manual_install(platform)));
        };

        let catalog = self.catalog.snapshot();
        let Some(entry) = select(&catalog, platform, prefer_dev) else {
            debug!(%platform, prefer_dev, "No catalog entry; manual install");
            return Ok(PortalResponse::Manual(self.manual_install(Some(platform))));
        };

        let token = self
            .tokens
            .issue(account_id, TokenType::DownloadAuthorization, deadline)
            .await?;

        let with_companion = self.config.wants_vbox() && entry.has_companion();
        let primary = self.action(
            ActionKind::Client,
            project_id,
            token.expose(),
            account_id,
            entry,
            !with_companion,
        );
        let companion = if with_companion {
            Some(self.action(
                ActionKind::ClientWithVbox,
                project_id,
                token.expose(),
                account_id,
                entry,
                true,
            ))
        } else {
            None
        };

        info!(%platform, %account_id, companion = companion.is_some(), "Download offer issued");
        Ok(PortalResponse::Offer(DownloadOffer {
            project_name: self.config.project_name.clone(),
            platform,
            primary,
            companion,
            vbox: self.vbox_advice(platform.is_windows(), false),
        }))
    }

    fn action(
        &self,
        kind: ActionKind,
        project_id: u32,
        token: &str,
        account_id: AccountId,
        entry: &VersionEntry,
        highlighted: bool,
    ) -> DownloadAction {
        let (filename, size_mb, companion_version) = match (kind, entry.companion.as_ref()) {
            (ActionKind::ClientWithVbox, Some(companion)) => (
                companion.filename.clone(),
                companion.size_mb,
                Some(companion.version.clone()),
            ),
            _ => (entry.filename.clone(), entry.size_mb, None),
        };
        DownloadAction {
            kind,
            delivery_url: self.config.delivery_url.clone(),
            project_id,
            token: token.to_string(),
            user_id: account_id,
            filename,
            platform_label: entry.platform_label.clone(),
            size_mb,
            client_version: entry.version_num.clone(),
            companion_version,
            highlighted,
        }
    }

    async fn rpc_get_info(
        &self,
        rpc_key: Option<&str>,
        authenticator: &str,
        user_agent: &str,
        deadline: &Deadline,
    ) -> Result<DownloadDescriptor, NegotiateError> {
        if let Some(expected) = self.config.rpc_key.as_deref()
            && rpc_key != Some(expected)
        {
            return Err(NegotiateError::RpcKeyMismatch);
        }

        let account = deadline
            .run(
                "lookup_by_authenticator",
                self.accounts.lookup_by_authenticator(authenticator),
            )
            .await
            .map_err(AccountError::from)??
            .ok_or(NegotiateError::UserNotFound)?;

        let project_id = self.config.project_id.ok_or(NegotiateError::NoProjectId)?;

        let catalog = self.catalog.snapshot();
        let entry = platform::resolve(user_agent)
            .and_then(|platform| select(&catalog, platform, false))
            .ok_or(NegotiateError::NoVersionForPlatform)?;

        let token = self
            .tokens
            .issue(account.id, TokenType::DownloadAuthorization, deadline)
            .await?;

        info!(account_id = %account.id, platform = %entry.platform, "RPC download descriptor issued");
        Ok(DownloadDescriptor::build(
            project_id,
            token.expose().to_string(),
            account.id,
            entry,
            self.config.wants_vbox(),
        ))
    }

    fn attach_instructions(&self) -> AttachInstructions {
        if self.config.account_manager {
            AttachInstructions::AccountManager {
                project_name: self.config.project_name.clone(),
                help_url: self.config.account_manager_help_url.clone(),
            }
        } else {
            AttachInstructions::ProjectList {
                project_name: self.config.project_name.clone(),
                master_url: self.config.master_url.clone(),
            }
        }
    }

    fn vbox_advice(&self, windows: bool, installed: bool) -> Option<VboxAdvice> {
        let requirement = if self.config.need_vbox {
            VboxRequirement::Required
        } else if self.config.recommend_vbox {
            VboxRequirement::Recommended
        } else {
            return None;
        };
        let source = if windows && !installed {
            VboxSource::CombinedInstaller
        } else {
            VboxSource::DownloadPage {
                url: self.config.vbox_download_url.clone(),
            }
        };
        Some(VboxAdvice {
            requirement,
            source,
            restart_client: installed,
        })
    }

    /// Builds the manual-install fallback for a possibly unknown platform.
    #[must_use]
    pub fn manual_install(&self, platform: Option<PlatformId>) -> ManualInstall {
        ManualInstall {
            download_page_url: self.config.download_page_url.clone(),
            vbox: self.vbox_advice(platform.is_some_and(PlatformId::is_windows), false),
            attach: self.attach_instructions(),
        }
    }

    /// Builds the notice for an already installed client.
    #[must_use]
    pub fn installed_notice(&self) -> InstalledNotice {
        let attach = self.attach_instructions();
        // Account-manager users get the companion through the manager.
        let vbox = if self.config.account_manager {
            None
        } else {
            self.vbox_advice(false, true)
        };
        InstalledNotice {
            steps: attach.installed_steps(),
            attach,
            vbox,
            home_page: self.config.home_page.clone(),
        }
    }
}
