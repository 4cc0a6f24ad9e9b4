//! Version selection: pick the single best build for a platform.

use crate::platform::PlatformId;

use super::{Catalog, VersionEntry};

/// Picks the catalog entry to offer for `platform`.
///
/// With `prefer_dev == false` the first "Recommended" entry for the platform
/// wins. With `prefer_dev == true` the first "Development" entry wins and
/// there is no fallback to the recommended build: a platform without a
/// development build yields `None`.
#[must_use]
pub fn select(catalog: &Catalog, platform: PlatformId, prefer_dev: bool) -> Option<&VersionEntry> {
    catalog
        .entries_for(platform)
        .find(|entry| {
            if prefer_dev {
                entry.is_development()
            } else {
                entry.is_recommended()
            }
        })
}
