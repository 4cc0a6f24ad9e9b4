//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::path::PathBuf;

use autoattach_core::{Catalog, Database};
use tempfile::TempDir;

/// Three-platform feed; only the Windows entry carries a companion bundle.
pub const FEED: &str = r#"{"versions":[
    {"dbplatform":"windows_x86_64","platform":"Windows 64-bit","description":"Recommended version",
     "filename":"client_8.0.2_windows_x86_64.exe","size_mb":9.5,"version_num":"8.0.2",
     "vbox_filename":"client_8.0.2_windows_x86_64_vbox.exe","vbox_size_mb":120.0,"vbox_version":"7.0.12"},
    {"dbplatform":"windows_x86_64","platform":"Windows 64-bit","description":"Development version",
     "filename":"client_8.1.0_windows_x86_64.exe","size_mb":9.8,"version_num":"8.1.0"},
    {"dbplatform":"x86_64-apple-darwin","platform":"Mac OS X","description":"Recommended version",
     "filename":"client_8.0.2_macOSX_universal.zip","size_mb":12.0,"version_num":"8.0.2"},
    {"dbplatform":"x86_64-pc-linux-gnu","platform":"Linux x64","description":"Recommended version",
     "filename":"client_8.0.2_x86_64-pc-linux-gnu.sh","size_mb":8.0,"version_num":"8.0.2"}
]}"#;

/// The same builds as [`FEED`] in the publisher's XML form, with the extra
/// elements it emits.
pub const XML_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<versions>
<version>
    <dbplatform>windows_x86_64</dbplatform>
    <platform>Windows 64-bit</platform>
    <description>Recommended version</description>
    <version_num>8.0.2</version_num>
    <filename>client_8.0.2_windows_x86_64.exe</filename>
    <size_mb>9.5</size_mb>
    <date>4 Jun 2024</date>
    <vbox_filename>client_8.0.2_windows_x86_64_vbox.exe</vbox_filename>
    <vbox_size_mb>120.0</vbox_size_mb>
    <vbox_version>7.0.12</vbox_version>
</version>
<version>
    <dbplatform>windows_x86_64</dbplatform>
    <platform>Windows 64-bit</platform>
    <description>Development version</description>
    <version_num>8.1.0</version_num>
    <filename>client_8.1.0_windows_x86_64.exe</filename>
    <size_mb>9.8</size_mb>
    <date>20 Sep 2024</date>
    <vbox_filename></vbox_filename>
</version>
<version>
    <dbplatform>x86_64-apple-darwin</dbplatform>
    <platform>Mac OS X</platform>
    <description>Recommended version</description>
    <version_num>8.0.2</version_num>
    <filename>client_8.0.2_macOSX_universal.zip</filename>
    <size_mb>12.0</size_mb>
</version>
<version>
    <dbplatform>x86_64-pc-linux-gnu</dbplatform>
    <platform>Linux x64</platform>
    <description>Recommended version</description>
    <version_num>8.0.2</version_num>
    <filename>client_8.0.2_x86_64-pc-linux-gnu.sh</filename>
    <size_mb>8.0</size_mb>
</version>
</versions>
"#;

pub const WINDOWS_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub const LINUX_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

pub fn catalog() -> Catalog {
    Catalog::from_json(FEED).expect("fixture feed should parse")
}

/// File-backed database in a fresh temp dir; keep the `TempDir` alive.
pub async fn setup_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("portal.db");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

pub fn db_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("portal.db")
}
