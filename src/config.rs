//! Read-only portal configuration consumed by the negotiator and consent handoff.

use std::time::Duration;

use crate::deadline::DEFAULT_REQUEST_DEADLINE;
use crate::token::TokenLifetimes;

/// Delivery ("concierge") endpoint that redeems download-authorization tokens.
pub const DEFAULT_DELIVERY_URL: &str = "https://boinc.berkeley.edu/concierge.php";

/// Public client download page used by the manual-install fallback.
pub const DEFAULT_DOWNLOAD_PAGE_URL: &str = "https://boinc.berkeley.edu/download.php";

/// Where users get the virtualization companion on platforms without a combined installer.
pub const DEFAULT_VBOX_DOWNLOAD_URL: &str = "https://www.virtualbox.org/wiki/Downloads";

/// Account-manager setup instructions.
pub const DEFAULT_ACCOUNT_MANAGER_HELP_URL: &str = "https://boinc.berkeley.edu/wiki/Account_managers";

/// Local page a completed consent handoff lands on when no `next_url` is given.
pub const DEFAULT_HOME_PAGE: &str = "home.php";

/// Project-level settings.
///
/// A missing `project_id` disables the simplified install flow: interactive
/// requests fall back to manual install and RPC requests fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub project_name: String,
    /// Project master URL; consent redirects are resolved against it.
    pub master_url: String,
    pub project_id: Option<u32>,
    /// The project cannot run without the virtualization companion.
    pub need_vbox: bool,
    /// The project can use the virtualization companion.
    pub recommend_vbox: bool,
    /// Users attach through an account manager rather than by project URL.
    pub account_manager: bool,
    /// Shared secret for the RPC path. `None` accepts any caller.
    pub rpc_key: Option<String>,
    pub delivery_url: String,
    pub download_page_url: String,
    pub vbox_download_url: String,
    pub account_manager_help_url: String,
    pub home_page: String,
    /// Client version feed location, if the portal refreshes it.
    pub feed_url: Option<String>,
    pub token_lifetimes: TokenLifetimes,
    /// Budget for all store and lookup calls made by one request.
    pub request_deadline: Duration,
}

impl PortalConfig {
    /// True when the project requires or recommends the companion.
    #[must_use]
    pub fn wants_vbox(&self) -> bool {
        self.need_vbox || self.recommend_vbox
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            project_name: "Project".to_string(),
            master_url: "http://localhost/".to_string(),
            project_id: None,
            need_vbox: false,
            recommend_vbox: false,
            account_manager: false,
            rpc_key: None,
            delivery_url: DEFAULT_DELIVERY_URL.to_string(),
            download_page_url: DEFAULT_DOWNLOAD_PAGE_URL.to_string(),
            vbox_download_url: DEFAULT_VBOX_DOWNLOAD_URL.to_string(),
            account_manager_help_url: DEFAULT_ACCOUNT_MANAGER_HELP_URL.to_string(),
            home_page: DEFAULT_HOME_PAGE.to_string(),
            feed_url: None,
            token_lifetimes: TokenLifetimes::default(),
            request_deadline: DEFAULT_REQUEST_DEADLINE,
        }
    }
}
