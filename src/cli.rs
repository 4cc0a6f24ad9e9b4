//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use autoattach_core::AccountId;
use clap::{Parser, Subcommand};

/// Client download authorization for a volunteer-computing project portal.
///
/// Resolves the right client build for a browser, issues single-use download
/// tokens, and completes the terms-of-use consent handoff.
#[derive(Parser, Debug)]
#[command(name = "autoattach")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Portal database file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/autoattach/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Local copy of the version feed
    #[arg(long, global = true)]
    pub versions: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download the version feed, validate it, and save it locally
    FetchVersions {
        /// Feed URL (overrides `feed_url` in the config file)
        #[arg(long)]
        url: Option<String>,
    },

    /// Build the download offer a logged-in user would see
    Offer {
        #[arg(long)]
        account_id: AccountId,
        /// Browser user-agent string
        #[arg(long)]
        user_agent: String,
        /// Offer the development build instead of the recommended one
        #[arg(long)]
        dev: bool,
    },

    /// Show attach instructions for an already installed client
    Installed,

    /// Answer a download-info RPC as JSON
    Rpc {
        /// Account authenticator
        #[arg(long)]
        auth: String,
        #[arg(long)]
        user_agent: String,
        #[arg(long)]
        rpc_key: Option<String>,
    },

    /// Start a consent handoff and print the cookies to set
    BeginConsent {
        #[arg(long)]
        account_id: AccountId,
        /// Keep the resulting session beyond the browser session
        #[arg(long)]
        permanent: bool,
    },

    /// Submit the terms-of-use form for a pending handoff
    CompleteConsent {
        /// Value of the `logintoken` cookie
        #[arg(long)]
        token: String,
        /// Value of the `tempuserid` cookie
        #[arg(long)]
        account_id: String,
        /// Tick the terms-of-use checkbox
        #[arg(long)]
        agree: bool,
        /// Present the `tempperm` cookie
        #[arg(long)]
        permanent: bool,
        /// Local page to land on afterwards
        #[arg(long)]
        next_url: Option<String>,
    },

    /// Delete expired tokens
    Sweep,

    /// Add an account (for provisioning and testing)
    CreateAccount {
        #[arg(long)]
        name: String,
        /// Account authenticator
        #[arg(long)]
        auth: String,
    },
}
