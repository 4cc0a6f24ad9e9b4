//! User-Agent string for outbound feed requests.

/// Product token sent ahead of the version.
const PRODUCT: &str = "autoattach";

/// Default User-Agent for version feed requests (identifies the tool).
#[must_use]
pub(crate) fn default_feed_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (version-feed)")
}
