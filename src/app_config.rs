//! Portal configuration file loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use autoattach_core::PortalConfig;
use autoattach_core::catalog::FeedTimeouts;
use autoattach_core::db::DbOptions;

/// `key = value` file configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub project_name: Option<String>,
    pub master_url: Option<String>,
    pub project_id: Option<u32>,
    pub need_vbox: Option<bool>,
    pub recommend_vbox: Option<bool>,
    pub account_manager: Option<bool>,
    pub rpc_key: Option<String>,
    pub delivery_url: Option<String>,
    pub download_page_url: Option<String>,
    pub vbox_download_url: Option<String>,
    pub home_page: Option<String>,
    pub feed_url: Option<String>,
    pub db_path: Option<PathBuf>,
    pub versions_path: Option<PathBuf>,
    /// Download-authorization token lifetime in seconds.
    pub download_token_lifetime_secs: Option<u64>,
    /// Login-intercept token lifetime in seconds.
    pub login_token_lifetime_secs: Option<u64>,
    pub request_deadline_ms: Option<u64>,
    pub feed_connect_timeout_secs: Option<u64>,
    pub feed_read_timeout_secs: Option<u64>,
    pub db_max_connections: Option<u32>,
    pub db_busy_timeout_ms: Option<u32>,
}

impl FileConfig {
    /// Validates values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(project_id) = self.project_id
            && project_id == 0
        {
            bail!("Invalid config value for `project_id`: 0. Expected a positive integer");
        }
        validate_range(
            "download_token_lifetime_secs",
            self.download_token_lifetime_secs,
            60..=30 * 86_400,
        )?;
        validate_range(
            "login_token_lifetime_secs",
            self.login_token_lifetime_secs,
            60..=7 * 86_400,
        )?;
        validate_range("request_deadline_ms", self.request_deadline_ms, 10..=60_000)?;
        validate_range(
            "feed_connect_timeout_secs",
            self.feed_connect_timeout_secs,
            1..=3600,
        )?;
        validate_range("feed_read_timeout_secs", self.feed_read_timeout_secs, 1..=3600)?;
        validate_range(
            "db_max_connections",
            self.db_max_connections.map(u64::from),
            1..=20,
        )?;
        validate_range(
            "db_busy_timeout_ms",
            self.db_busy_timeout_ms.map(u64::from),
            0..=120_000,
        )?;
        for (field, value) in [
            ("master_url", &self.master_url),
            ("delivery_url", &self.delivery_url),
            ("download_page_url", &self.download_page_url),
            ("vbox_download_url", &self.vbox_download_url),
            ("feed_url", &self.feed_url),
        ] {
            if let Some(value) = value {
                url::Url::parse(value).with_context(|| {
                    format!("Invalid config value for `{field}`: '{value}' is not an absolute URL")
                })?;
            }
        }
        Ok(())
    }

    /// Applies the file values over the library defaults.
    #[must_use]
    pub fn portal_config(&self) -> PortalConfig {
        let mut config = PortalConfig::default();
        if let Some(value) = &self.project_name {
            config.project_name.clone_from(value);
        }
        if let Some(value) = &self.master_url {
            config.master_url.clone_from(value);
        }
        config.project_id = self.project_id;
        config.need_vbox = self.need_vbox.unwrap_or(false);
        config.recommend_vbox = self.recommend_vbox.unwrap_or(false);
        config.account_manager = self.account_manager.unwrap_or(false);
        config.rpc_key.clone_from(&self.rpc_key);
        if let Some(value) = &self.delivery_url {
            config.delivery_url.clone_from(value);
        }
        if let Some(value) = &self.download_page_url {
            config.download_page_url.clone_from(value);
        }
        if let Some(value) = &self.vbox_download_url {
            config.vbox_download_url.clone_from(value);
        }
        if let Some(value) = &self.home_page {
            config.home_page.clone_from(value);
        }
        config.feed_url.clone_from(&self.feed_url);
        if let Some(secs) = self.download_token_lifetime_secs {
            config.token_lifetimes.download_authorization = Duration::from_secs(secs);
        }
        if let Some(secs) = self.login_token_lifetime_secs {
            config.token_lifetimes.login_intercept = Duration::from_secs(secs);
        }
        if let Some(ms) = self.request_deadline_ms {
            config.request_deadline = Duration::from_millis(ms);
        }
        config
    }

    #[must_use]
    pub fn feed_timeouts(&self) -> FeedTimeouts {
        let defaults = FeedTimeouts::default();
        FeedTimeouts {
            connect_timeout_secs: self
                .feed_connect_timeout_secs
                .unwrap_or(defaults.connect_timeout_secs),
            read_timeout_secs: self
                .feed_read_timeout_secs
                .unwrap_or(defaults.read_timeout_secs),
        }
    }

    #[must_use]
    pub fn db_options(&self) -> DbOptions {
        let defaults = DbOptions::default();
        DbOptions {
            max_connections: self.db_max_connections.unwrap_or(defaults.max_connections),
            busy_timeout_ms: self.db_busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
        }
    }
}

fn validate_range(
    field: &str,
    value: Option<u64>,
    range: std::ops::RangeInclusive<u64>,
) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !range.contains(&value) {
        bail!(
            "Invalid config value for `{field}`: {value}. Expected range: {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/autoattach/config.toml`
/// 2. `$HOME/.config/autoattach/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("autoattach")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("autoattach")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads `explicit` if given (it must exist), else the default path if present.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return load_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "project_name" => cfg.project_name = Some(parse_string_literal(value).with_context(context)?),
            "master_url" => cfg.master_url = Some(parse_string_literal(value).with_context(context)?),
            "project_id" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let id = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("project_id out of range for u32"))
                    .with_context(context)?;
                cfg.project_id = Some(id);
            }
            "need_vbox" => cfg.need_vbox = Some(parse_boolean(value).with_context(context)?),
            "recommend_vbox" => {
                cfg.recommend_vbox = Some(parse_boolean(value).with_context(context)?);
            }
            "account_manager" => {
                cfg.account_manager = Some(parse_boolean(value).with_context(context)?);
            }
            "rpc_key" => cfg.rpc_key = Some(parse_string_literal(value).with_context(context)?),
            "delivery_url" => {
                cfg.delivery_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "download_page_url" => {
                cfg.download_page_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "vbox_download_url" => {
                cfg.vbox_download_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "home_page" => cfg.home_page = Some(parse_string_literal(value).with_context(context)?),
            "feed_url" => cfg.feed_url = Some(parse_string_literal(value).with_context(context)?),
            "db_path" => {
                cfg.db_path = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "versions_path" => {
                cfg.versions_path = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "download_token_lifetime_secs" => {
                cfg.download_token_lifetime_secs =
                    Some(parse_integer_u64(value).with_context(context)?);
            }
            "login_token_lifetime_secs" => {
                cfg.login_token_lifetime_secs =
                    Some(parse_integer_u64(value).with_context(context)?);
            }
            "request_deadline_ms" => {
                cfg.request_deadline_ms = Some(parse_integer_u64(value).with_context(context)?);
            }
            "feed_connect_timeout_secs" => {
                cfg.feed_connect_timeout_secs =
                    Some(parse_integer_u64(value).with_context(context)?);
            }
            "feed_read_timeout_secs" => {
                cfg.feed_read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "db_max_connections" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("db_max_connections out of range for u32"))?;
                cfg.db_max_connections = Some(n);
            }
            "db_busy_timeout_ms" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("db_busy_timeout_ms out of range for u32"))?;
                cfg.db_busy_timeout_ms = Some(n);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
