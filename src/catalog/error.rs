//! Error types for catalog loading and feed fetching.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or refreshing the version catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The feed document is not valid JSON or does not match the schema.
    #[error("malformed version feed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The upstream XML feed could not be read into `<version>` records.
    #[error("malformed XML version feed: {0}")]
    MalformedXml(#[from] quick_xml::de::DeError),

    /// A feed entry parsed but failed validation.
    #[error("invalid version entry #{index} ({platform}): {reason}")]
    InvalidEntry {
        /// Zero-based position of the entry in the feed.
        index: usize,
        /// Platform key as it appeared in the feed.
        platform: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Reading or writing a local feed file failed.
    #[error("IO error on version feed {path}: {source}")]
    Io {
        /// File path that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Network-level error while fetching the feed.
    #[error("network error fetching version feed {url}: {source}")]
    Network {
        /// Feed URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The feed endpoint answered with a non-success status.
    #[error("HTTP {status} fetching version feed {url}")]
    HttpStatus {
        /// Feed URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// HTTP client construction failed.
    #[error("failed to build feed HTTP client: {0}")]
    Client(String),
}

impl CatalogError {
    pub(crate) fn invalid_entry(index: usize, platform: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            index,
            platform: platform.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true when the failure is transport-level and a later refresh may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Io { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_)
            | Self::MalformedXml(_)
            | Self::InvalidEntry { .. }
            | Self::Client(_) => false,
        }
    }
}
