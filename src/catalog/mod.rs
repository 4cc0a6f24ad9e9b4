//! Version catalog of installable client builds.
//!
//! The catalog is an immutable value. A [`CatalogHandle`] holds the current
//! `Arc<Catalog>`; a refresh builds a complete new catalog and swaps the
//! pointer, so readers that already cloned the `Arc` keep a consistent view.
//!
//! # Overview
//!
//! - [`Catalog`] - ordered list of [`VersionEntry`] records
//! - [`select`] - picks the build to offer for a platform
//! - [`FeedClient`] - fetches the published feed over HTTP
//! - [`CatalogHandle`] - shared, swappable reference to the current catalog

mod entry;
mod error;
mod feed;
mod select;
mod xml;

pub use entry::{CompanionPackage, DEVELOPMENT_MARKER, RECOMMENDED_MARKER, VersionEntry};
pub use error::CatalogError;
pub use feed::{FeedClient, FeedTimeouts, spawn_refresh_task};
pub use select::select;

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, instrument};

use crate::platform::PlatformId;
use entry::{FeedDocument, FeedVersion};
use xml::XmlFeedDocument;

/// Ordered collection of client builds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<VersionEntry>,
}

impl Catalog {
    #[must_use]
    pub fn new(entries: Vec<VersionEntry>) -> Self {
        Self { entries }
    }

    /// Parses and validates a feed document.
    ///
    /// Any malformed entry fails the whole load.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Malformed`] when the document does not match the
    /// schema, or [`CatalogError::InvalidEntry`] when an entry fails validation.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let document: FeedDocument = serde_json::from_str(raw)?;
        let entries = document
            .versions
            .into_iter()
            .enumerate()
            .map(|(index, version)| version.validate(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Parses and validates the upstream XML feed (`<versions><version>...`).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MalformedXml`] when the document cannot be read
    /// into version records, or [`CatalogError::InvalidEntry`] when a record
    /// fails validation.
    pub fn from_xml(raw: &str) -> Result<Self, CatalogError> {
        let entries = XmlFeedDocument::parse(raw)?
            .versions
            .into_iter()
            .enumerate()
            .map(|(index, version)| version.into_feed_version(index)?.validate(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Parses a feed in either form; a leading `<` selects XML.
    ///
    /// # Errors
    ///
    /// Returns the error of whichever parser the document was routed to.
    pub fn from_feed(raw: &str) -> Result<Self, CatalogError> {
        if raw.trim_start().starts_with('<') {
            Self::from_xml(raw)
        } else {
            Self::from_json(raw)
        }
    }

    /// Serializes the catalog back into the feed schema.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let document = FeedDocument {
            versions: self.entries.iter().map(FeedVersion::from_entry).collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Loads a catalog from a local feed file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, or a parse error.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn load_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_feed(&raw)?;
        info!(entries = catalog.len(), "Loaded version catalog");
        Ok(catalog)
    }

    /// Writes the catalog to a local feed file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be written.
    pub fn save_file(&self, path: &Path) -> Result<(), CatalogError> {
        let json = self.to_json()?;
        let io_error = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, json).map_err(io_error)
    }

    #[must_use]
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    /// Entries for one platform, in feed order.
    pub fn entries_for(&self, platform: PlatformId) -> impl Iterator<Item = &VersionEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.platform == platform)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared reference to the current catalog, replaced wholesale on refresh.
#[derive(Debug, Default)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Returns the catalog current at the time of the call.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Swaps in a new catalog and returns the one it replaced.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}
