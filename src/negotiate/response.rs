//! Responses produced by the negotiator.
//!
//! Everything here is plain data; rendering is left to the caller.

use serde::Serialize;

use crate::account::AccountId;
use crate::catalog::VersionEntry;
use crate::platform::PlatformId;

use super::NegotiateError;

/// What a download action installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// The client installer alone.
    Client,
    /// The client installer bundled with the virtualization companion.
    ClientWithVbox,
}

/// One download button: a form posted to the delivery service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadAction {
    pub kind: ActionKind,
    /// Where the form is posted.
    pub delivery_url: String,
    pub project_id: u32,
    pub token: String,
    pub user_id: AccountId,
    pub filename: String,
    pub platform_label: String,
    pub size_mb: f64,
    pub client_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion_version: Option<String>,
    /// Rendered as the emphasized choice.
    pub highlighted: bool,
}

impl DownloadAction {
    /// Hidden form fields, in posting order.
    #[must_use]
    pub fn form_fields(&self) -> [(&'static str, String); 4] {
        [
            ("project_id", self.project_id.to_string()),
            ("token", self.token.clone()),
            ("user_id", self.user_id.to_string()),
            ("filename", self.filename.clone()),
        ]
    }
}

/// Interactive offer with one or two download actions sharing one token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadOffer {
    pub project_name: String,
    pub platform: PlatformId,
    pub primary: DownloadAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion: Option<DownloadAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vbox: Option<VboxAdvice>,
}

impl DownloadOffer {
    /// Actions in display order: the bundled installer first when present.
    pub fn actions(&self) -> impl Iterator<Item = &DownloadAction> {
        self.companion.iter().chain(std::iter::once(&self.primary))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VboxRequirement {
    Required,
    Recommended,
}

/// How the user should obtain the virtualization companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum VboxSource {
    /// Pick the combined client+companion installer.
    CombinedInstaller,
    /// Install it separately from its download page.
    DownloadPage { url: String },
}

/// Virtualization notice shown alongside an offer, fallback, or installed notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VboxAdvice {
    pub requirement: VboxRequirement,
    #[serde(flatten)]
    pub source: VboxSource,
    /// The client must be restarted after installing the companion.
    pub restart_client: bool,
}

/// How to attach an installed client to the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AttachInstructions {
    /// Dismiss the project wizard and attach through the account manager.
    AccountManager {
        project_name: String,
        help_url: String,
    },
    /// Pick the project by name, or enter its master URL.
    ProjectList {
        project_name: String,
        master_url: String,
    },
}

impl AttachInstructions {
    /// Ordered steps for a client that is already installed.
    #[must_use]
    pub fn installed_steps(&self) -> Vec<String> {
        let (menu_item, project_name) = match self {
            Self::AccountManager { project_name, .. } => ("Use Account Manager", project_name),
            Self::ProjectList { project_name, .. } => ("Add Project", project_name),
        };
        vec![
            "In the BOINC manager, go to the Tools menu".to_string(),
            format!("Select {menu_item}"),
            format!("Select {project_name} from the list"),
            format!("Enter your {project_name} email address and password."),
        ]
    }
}

/// Fallback when the simplified install cannot be offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualInstall {
    pub download_page_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vbox: Option<VboxAdvice>,
    pub attach: AttachInstructions,
}

/// Notice for a user whose client is already installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledNotice {
    pub attach: AttachInstructions,
    pub steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vbox: Option<VboxAdvice>,
    pub home_page: String,
}

/// Client package block of an RPC descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageInfo {
    pub filename: String,
    pub size_mb: f64,
    pub client_version: String,
}

/// Bundled client+companion block of an RPC descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanionPackageInfo {
    pub filename: String,
    pub size_mb: f64,
    pub client_version: String,
    pub companion_version: String,
}

/// Machine-readable download information returned on the RPC path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadDescriptor {
    pub project_id: u32,
    pub token: String,
    pub user_id: AccountId,
    /// Human platform label from the version feed.
    pub platform: String,
    pub package: PackageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion_package: Option<CompanionPackageInfo>,
}

impl DownloadDescriptor {
    pub(crate) fn build(
        project_id: u32,
        token: String,
        user_id: AccountId,
        entry: &VersionEntry,
        include_companion: bool,
    ) -> Self {
        let companion_package = entry
            .companion
            .as_ref()
            .filter(|_| include_companion)
            .map(|companion| CompanionPackageInfo {
                filename: companion.filename.clone(),
                size_mb: companion.size_mb,
                client_version: entry.version_num.clone(),
                companion_version: companion.version.clone(),
            });
        Self {
            project_id,
            token,
            user_id,
            platform: entry.platform_label.clone(),
            package: PackageInfo {
                filename: entry.filename.clone(),
                size_mb: entry.size_mb,
                client_version: entry.version_num.clone(),
            },
            companion_package,
        }
    }
}

/// RPC error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// The RPC reply document: a descriptor or `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RpcReply {
    Descriptor(DownloadDescriptor),
    Error { error: RpcError },
}

impl RpcReply {
    /// Serializes the reply.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; only non-finite sizes can trigger it.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl From<Result<DownloadDescriptor, NegotiateError>> for RpcReply {
    fn from(result: Result<DownloadDescriptor, NegotiateError>) -> Self {
        match result {
            Ok(descriptor) => Self::Descriptor(descriptor),
            Err(err) => Self::Error {
                error: RpcError {
                    code: err.code(),
                    message: err.message(),
                },
            },
        }
    }
}
