//! Subcommand handlers.
//!
//! Each handler prints its result as JSON on stdout and returns the
//! [`ResponseClass`] that decides the process exit code. Failures are
//! described on stderr.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use autoattach_core::catalog::FeedClient;
use autoattach_core::consent::ConsentCookies;
use autoattach_core::outcome::{
    classify_catalog, classify_consent, classify_negotiate, classify_response,
};
use autoattach_core::{
    AccountId, Catalog, CatalogHandle, ConsentHandoff, ConsentSubmission, Database, Deadline,
    Descriptor, DownloadNegotiator, PortalConfig, PortalRequest, PortalResponse, ResponseClass,
    RpcReply, SqliteDirectory, SqliteTokenStore, TokenAuthority,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app_config::FileConfig;
use crate::cli::{Cli, Command};

const DEFAULT_DB_PATH: &str = "autoattach.db";
const DEFAULT_VERSIONS_PATH: &str = "versions.json";

/// Shared services for the portal subcommands.
struct Portal {
    directory: Arc<SqliteDirectory>,
    tokens: TokenAuthority,
    config: Arc<PortalConfig>,
    deadline: Deadline,
}

impl Portal {
    async fn open(db_path: &Path, file: &FileConfig) -> Result<Self> {
        let db = Database::with_options(db_path, file.db_options())
            .await
            .with_context(|| format!("Failed to open portal database '{}'", db_path.display()))?;
        let config = file.portal_config();
        let tokens = TokenAuthority::new(Arc::new(SqliteTokenStore::new(db.clone())))
            .with_lifetimes(config.token_lifetimes);
        Ok(Self {
            directory: Arc::new(SqliteDirectory::new(db)),
            tokens,
            deadline: Deadline::after(config.request_deadline),
            config: Arc::new(config),
        })
    }

    fn negotiator(&self, catalog: Catalog) -> DownloadNegotiator {
        DownloadNegotiator::new(
            Arc::new(CatalogHandle::new(catalog)),
            self.tokens.clone(),
            self.directory.clone(),
            self.config.clone(),
        )
    }

    fn handoff(&self) -> ConsentHandoff {
        ConsentHandoff::new(
            self.tokens.clone(),
            self.directory.clone(),
            self.directory.clone(),
            self.config.clone(),
        )
    }
}

/// Runs the selected subcommand.
pub(crate) async fn dispatch(cli: &Cli, file: &FileConfig) -> Result<ResponseClass> {
    let versions_path = resolve_path(
        cli.versions.as_ref(),
        file.versions_path.as_ref(),
        DEFAULT_VERSIONS_PATH,
    );
    let db_path = resolve_path(cli.db.as_ref(), file.db_path.as_ref(), DEFAULT_DB_PATH);
    let open = || open_portal(&db_path, file);

    match &cli.command {
        Command::FetchVersions { url } => {
            run_fetch_versions(url.as_deref(), file, &versions_path).await
        }
        Command::Offer {
            account_id,
            user_agent,
            dev,
        } => {
            let request = PortalRequest::Offer {
                account_id: *account_id,
                user_agent: user_agent.clone(),
                prefer_dev: *dev,
            };
            run_negotiate(&open().await?, &versions_path, request).await
        }
        Command::Installed => {
            run_negotiate(&open().await?, &versions_path, PortalRequest::InstalledNotice).await
        }
        Command::Rpc {
            auth,
            user_agent,
            rpc_key,
        } => {
            let request = PortalRequest::RpcGetInfo {
                rpc_key: rpc_key.clone(),
                authenticator: auth.clone(),
                user_agent: user_agent.clone(),
            };
            run_rpc(&open().await?, &versions_path, request).await
        }
        Command::BeginConsent {
            account_id,
            permanent,
        } => run_begin_consent(&open().await?, *account_id, *permanent).await,
        Command::CompleteConsent {
            token,
            account_id,
            agree,
            permanent,
            next_url,
        } => {
            let submission = ConsentSubmission {
                agree_to_terms_of_use: agree.then(|| "1".to_string()),
                next_url: next_url.clone(),
                cookies: ConsentCookies {
                    logintoken: Some(token.clone()),
                    tempuserid: Some(account_id.clone()),
                    tempperm: permanent.then(|| "1".to_string()),
                },
            };
            run_complete_consent(&open().await?, &submission).await
        }
        Command::Sweep => run_sweep(&open().await?).await,
        Command::CreateAccount { name, auth } => {
            run_create_account(&open().await?, name, auth).await
        }
    }
}

/// Opens the portal database; only subcommands that touch it call this.
async fn open_portal(db_path: &Path, file: &FileConfig) -> Result<Portal> {
    let portal = Portal::open(db_path, file).await?;
    debug!(db = %db_path.display(), "Portal database opened");
    Ok(portal)
}

fn resolve_path(cli: Option<&PathBuf>, file: Option<&PathBuf>, default: &str) -> PathBuf {
    cli.or(file)
        .cloned()
        .unwrap_or_else(|| PathBuf::from(default))
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Version feed file not found; serving an empty catalog"
        );
        return Ok(Catalog::default());
    }
    Catalog::load_file(path)
        .with_context(|| format!("Failed to load version feed '{}'", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(descriptor: Descriptor, error: &dyn Display) -> ResponseClass {
    eprintln!("{}: {}", descriptor.class.label(), descriptor.what);
    eprintln!("  cause: {error}");
    if !descriptor.fix.is_empty() {
        eprintln!("  fix: {}", descriptor.fix);
    }
    descriptor.class
}

async fn run_fetch_versions(
    url: Option<&str>,
    file: &FileConfig,
    versions_path: &Path,
) -> Result<ResponseClass> {
    let Some(url) = url.or(file.feed_url.as_deref()) else {
        bail!("No feed URL given; pass --url or set `feed_url` in the config file");
    };

    let client = FeedClient::with_timeouts(file.feed_timeouts())?;
    match client.fetch(url).await {
        Ok(catalog) => {
            catalog.save_file(versions_path).with_context(|| {
                format!("Failed to save version feed to '{}'", versions_path.display())
            })?;
            info!(
                entries = catalog.len(),
                path = %versions_path.display(),
                "Version feed saved"
            );
            print_json(&serde_json::json!({
                "entries": catalog.len(),
                "path": versions_path.display().to_string(),
            }))?;
            Ok(ResponseClass::Informational)
        }
        Err(error) => Ok(report(classify_catalog(&error), &error)),
    }
}

async fn run_negotiate(
    portal: &Portal,
    versions_path: &Path,
    request: PortalRequest,
) -> Result<ResponseClass> {
    let negotiator = portal.negotiator(load_catalog(versions_path)?);
    match negotiator.handle(request, &portal.deadline).await {
        Ok(response) => {
            print_json(&response)?;
            Ok(classify_response(&response).class)
        }
        Err(error) => Ok(report(classify_negotiate(&error), &error)),
    }
}

async fn run_rpc(
    portal: &Portal,
    versions_path: &Path,
    request: PortalRequest,
) -> Result<ResponseClass> {
    let negotiator = portal.negotiator(load_catalog(versions_path)?);
    let (reply, class) = match negotiator.handle(request, &portal.deadline).await {
        Ok(PortalResponse::Descriptor(descriptor)) => (
            RpcReply::Descriptor(descriptor),
            ResponseClass::Informational,
        ),
        Ok(other) => bail!("RPC request produced a non-RPC response: {other:?}"),
        Err(error) => {
            let class = classify_negotiate(&error).class;
            (RpcReply::from(Err(error)), class)
        }
    };
    println!("{}", reply.to_json()?);
    Ok(class)
}

async fn run_begin_consent(
    portal: &Portal,
    account_id: AccountId,
    permanent: bool,
) -> Result<ResponseClass> {
    match portal
        .handoff()
        .begin(account_id, permanent, &portal.deadline)
        .await
    {
        Ok(pending) => {
            print_json(&pending)?;
            Ok(ResponseClass::Informational)
        }
        Err(error) => Ok(report(classify_consent(&error), &error)),
    }
}

async fn run_complete_consent(
    portal: &Portal,
    submission: &ConsentSubmission,
) -> Result<ResponseClass> {
    match portal
        .handoff()
        .complete(submission, &portal.deadline)
        .await
    {
        Ok(outcome) => {
            print_json(&outcome)?;
            Ok(ResponseClass::Informational)
        }
        Err(error) => Ok(report(classify_consent(&error), &error)),
    }
}

async fn run_sweep(portal: &Portal) -> Result<ResponseClass> {
    match portal.tokens.sweep_expired(&portal.deadline).await {
        Ok(removed) => {
            print_json(&serde_json::json!({ "removed": removed }))?;
            Ok(ResponseClass::Informational)
        }
        Err(error) => {
            let class = if error.is_transient() {
                ResponseClass::TryAgain
            } else {
                ResponseClass::ErrorPage
            };
            eprintln!("{}: token sweep failed: {error}", class.label());
            Ok(class)
        }
    }
}

async fn run_create_account(portal: &Portal, name: &str, auth: &str) -> Result<ResponseClass> {
    let id = portal
        .directory
        .create_account(name, auth)
        .await
        .context("Failed to create account")?;
    print_json(&serde_json::json!({ "id": id.get(), "name": name }))?;
    Ok(ResponseClass::Informational)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path_prefers_cli_then_file() {
        let cli = PathBuf::from("/cli.db");
        let file = PathBuf::from("/file.db");
        assert_eq!(resolve_path(Some(&cli), Some(&file), "d.db"), cli);
        assert_eq!(resolve_path(None, Some(&file), "d.db"), file);
        assert_eq!(resolve_path(None, None, "d.db"), PathBuf::from("d.db"));
    }

    #[test]
    fn test_load_catalog_missing_file_is_empty() {
        let catalog = load_catalog(Path::new("/nonexistent/versions.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_load_catalog_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_catalog(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to load version feed"));
    }
}
