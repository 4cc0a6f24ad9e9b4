//! Upstream XML form of the version feed.
//!
//! The publisher serves `<versions>` with one `<version>` element per build,
//! every value as element text. Records are mapped onto [`FeedVersion`] and
//! then go through the same validation as the JSON form.

use serde::Deserialize;

use super::CatalogError;
use super::entry::FeedVersion;

#[derive(Debug, Deserialize)]
pub(crate) struct XmlFeedDocument {
    #[serde(rename = "version", default)]
    pub versions: Vec<XmlVersion>,
}

/// One `<version>` element. Extra publisher elements such as `<date>` are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct XmlVersion {
    dbplatform: String,
    platform: String,
    description: String,
    filename: String,
    size_mb: String,
    version_num: String,
    #[serde(default)]
    vbox_filename: Option<String>,
    #[serde(default)]
    vbox_size_mb: Option<String>,
    #[serde(default)]
    vbox_version: Option<String>,
}

impl XmlFeedDocument {
    pub(crate) fn parse(raw: &str) -> Result<Self, CatalogError> {
        Ok(quick_xml::de::from_str(raw)?)
    }
}

impl XmlVersion {
    pub(crate) fn into_feed_version(self, index: usize) -> Result<FeedVersion, CatalogError> {
        let size = |field: &str, value: &str| {
            value.trim().parse::<f64>().map_err(|_| {
                CatalogError::invalid_entry(
                    index,
                    &self.dbplatform,
                    format!("{field} is not a number: {value:?}"),
                )
            })
        };

        let size_mb = size("size_mb", &self.size_mb)?;
        let vbox_size_mb = present(self.vbox_size_mb.as_deref())
            .map(|value| size("vbox_size_mb", value))
            .transpose()?;

        Ok(FeedVersion {
            vbox_filename: present(self.vbox_filename.as_deref()).map(str::to_string),
            vbox_version: present(self.vbox_version.as_deref()).map(str::to_string),
            vbox_size_mb,
            size_mb,
            dbplatform: self.dbplatform,
            platform: self.platform,
            description: self.description,
            filename: self.filename,
            version_num: self.version_num,
        })
    }
}

/// An empty element means the field is absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<versions>
<version>
    <dbplatform>windows_x86_64</dbplatform>
    <platform>Windows</platform>
    <description>Recommended version</description>
    <version_num>8.0.2</version_num>
    <filename>boinc_8.0.2_windows_x86_64.exe</filename>
    <size_mb>9.52</size_mb>
    <date>12 Mar 2024</date>
    <vbox_filename></vbox_filename>
    <vbox_size_mb></vbox_size_mb>
    <vbox_version></vbox_version>
</version>
<version>
    <dbplatform>windows_x86_64</dbplatform>
    <platform>Windows</platform>
    <description>Recommended version</description>
    <version_num>8.0.2</version_num>
    <filename>boinc_8.0.2_windows_x86_64_vbox.exe</filename>
    <size_mb>9.52</size_mb>
    <vbox_filename>VirtualBox-7.0.12-159484-Win.exe</vbox_filename>
    <vbox_size_mb>105.2</vbox_size_mb>
    <vbox_version>7.0.12</vbox_version>
</version>
</versions>
"#;

    fn parse(raw: &str) -> Result<Vec<FeedVersion>, CatalogError> {
        XmlFeedDocument::parse(raw)?
            .versions
            .into_iter()
            .enumerate()
            .map(|(index, version)| version.into_feed_version(index))
            .collect()
    }

    #[test]
    fn test_parse_reads_text_fields() {
        let versions = parse(FEED).unwrap();
        assert_eq!(versions.len(), 2);

        let second = &versions[1];
        assert_eq!(second.dbplatform, "windows_x86_64");
        assert!((second.size_mb - 9.52).abs() < f64::EPSILON);
        assert_eq!(second.vbox_size_mb, Some(105.2));
        assert_eq!(second.vbox_version.as_deref(), Some("7.0.12"));
    }

    #[test]
    fn test_empty_companion_elements_are_absent() {
        let first = parse(FEED).unwrap().remove(0);
        assert!(first.vbox_filename.is_none());
        assert!(first.vbox_size_mb.is_none());
        assert!(first.vbox_version.is_none());
    }

    #[test]
    fn test_non_numeric_size_names_the_entry() {
        let raw = FEED.replace("<size_mb>9.52</size_mb>\n    <date>", "<size_mb>big</size_mb>\n    <date>");
        let err = parse(&raw).unwrap_err();
        assert!(
            matches!(err, CatalogError::InvalidEntry { index: 0, .. }),
            "got {err:?}"
        );
        assert!(err.to_string().contains("size_mb"));
    }

    #[test]
    fn test_missing_required_element_is_malformed() {
        let raw = FEED.replace("<version_num>8.0.2</version_num>", "");
        assert!(matches!(parse(&raw), Err(CatalogError::MalformedXml(_))));
    }

    #[test]
    fn test_empty_document_has_no_versions() {
        assert!(parse("<versions></versions>").unwrap().is_empty());
    }
}
