//! Version entries and the strict feed schema they are parsed from.

use serde::{Deserialize, Serialize};

use crate::platform::PlatformId;

use super::CatalogError;

/// Description marker for the build offered by default.
pub const RECOMMENDED_MARKER: &str = "Recommended";

/// Description marker for pre-release builds.
pub const DEVELOPMENT_MARKER: &str = "Development";

/// Optional virtualization companion bundled with a client build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanionPackage {
    pub filename: String,
    pub size_mb: f64,
    /// Version of the bundled virtualization software.
    pub version: String,
}

/// One installable client build for one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionEntry {
    pub platform: PlatformId,
    /// Human-readable platform name shown on download actions.
    pub platform_label: String,
    /// Free text carrying markers such as "Recommended" or "Development".
    pub description: String,
    pub filename: String,
    pub size_mb: f64,
    pub version_num: String,
    pub companion: Option<CompanionPackage>,
}

impl VersionEntry {
    #[must_use]
    pub fn is_recommended(&self) -> bool {
        self.description.contains(RECOMMENDED_MARKER)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        self.description.contains(DEVELOPMENT_MARKER)
    }

    #[must_use]
    pub fn has_companion(&self) -> bool {
        self.companion.is_some()
    }
}

/// Top-level feed document.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FeedDocument {
    pub versions: Vec<FeedVersion>,
}

/// Feed record exactly as published; validated into a [`VersionEntry`].
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FeedVersion {
    pub dbplatform: String,
    pub platform: String,
    pub description: String,
    pub filename: String,
    pub size_mb: f64,
    pub version_num: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vbox_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vbox_size_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vbox_version: Option<String>,
}

impl FeedVersion {
    pub(crate) fn validate(self, index: usize) -> Result<VersionEntry, CatalogError> {
        let platform = self
            .dbplatform
            .parse::<PlatformId>()
            .map_err(|reason| CatalogError::invalid_entry(index, &self.dbplatform, reason))?;

        let invalid = |reason: &str| CatalogError::invalid_entry(index, &self.dbplatform, reason);

        if self.filename.trim().is_empty() {
            return Err(invalid("empty filename"));
        }
        if self.version_num.trim().is_empty() {
            return Err(invalid("empty version number"));
        }
        if !is_valid_size(self.size_mb) {
            return Err(invalid("size_mb must be finite and non-negative"));
        }

        let companion = match (self.vbox_filename, self.vbox_size_mb, self.vbox_version) {
            (None, None, None) => None,
            (Some(filename), Some(size_mb), Some(version)) => {
                if filename.trim().is_empty() {
                    return Err(invalid("empty companion filename"));
                }
                if !is_valid_size(size_mb) {
                    return Err(invalid("vbox_size_mb must be finite and non-negative"));
                }
                Some(CompanionPackage {
                    filename,
                    size_mb,
                    version,
                })
            }
            _ => {
                return Err(invalid(
                    "companion fields vbox_filename, vbox_size_mb, vbox_version must be all present or all absent",
                ));
            }
        };

        Ok(VersionEntry {
            platform,
            platform_label: self.platform,
            description: self.description,
            filename: self.filename,
            size_mb: self.size_mb,
            version_num: self.version_num,
            companion,
        })
    }

    pub(crate) fn from_entry(entry: &VersionEntry) -> Self {
        Self {
            dbplatform: entry.platform.as_str().to_string(),
            platform: entry.platform_label.clone(),
            description: entry.description.clone(),
            filename: entry.filename.clone(),
            size_mb: entry.size_mb,
            version_num: entry.version_num.clone(),
            vbox_filename: entry.companion.as_ref().map(|c| c.filename.clone()),
            vbox_size_mb: entry.companion.as_ref().map(|c| c.size_mb),
            vbox_version: entry.companion.as_ref().map(|c| c.version.clone()),
        }
    }
}

fn is_valid_size(size_mb: f64) -> bool {
    size_mb.is_finite() && size_mb >= 0.0
}
