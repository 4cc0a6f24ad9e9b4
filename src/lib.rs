//! Autoattach Core Library
//!
//! Client download authorization and version resolution for a
//! volunteer-computing project portal: work out which client build a visitor
//! needs, and hand out a single-use token that a separate delivery service
//! redeems to release the installer and attach it to the visitor's account.
//!
//! # Architecture
//!
//! - [`platform`] - user-agent to platform identifier
//! - [`catalog`] - version catalog, strict feed parsing, selection, refresh
//! - [`token`] - single-use typed tokens over a pluggable store
//! - [`account`] - read-only account lookups and consent recording
//! - [`negotiate`] - offers, manual-install fallback, installed notice, RPC descriptor
//! - [`consent`] - terms-of-use consent handoff back into a session
//! - [`outcome`] - user-visible classification of results and errors
//! - [`db`] - `SQLite` pool and schema migrations

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod account;
pub mod catalog;
pub mod config;
pub mod consent;
pub mod db;
pub mod deadline;
pub mod negotiate;
pub mod outcome;
pub mod platform;
pub mod token;
mod user_agent;

// Re-export commonly used types
pub use account::{Account, AccountDirectory, AccountError, AccountId, ConsentLedger, SqliteDirectory};
pub use catalog::{Catalog, CatalogError, CatalogHandle, FeedClient, VersionEntry, select};
pub use config::PortalConfig;
pub use consent::{ConsentError, ConsentHandoff, ConsentOutcome, ConsentSubmission};
pub use db::{Database, DbError, DbOptions, StoreErrorKind};
pub use deadline::{Deadline, Elapsed};
pub use negotiate::{
    DownloadDescriptor, DownloadNegotiator, DownloadOffer, NegotiateError, PortalRequest,
    PortalResponse, RpcReply,
};
pub use outcome::{Descriptor, ResponseClass};
pub use platform::PlatformId;
pub use token::{
    MemoryTokenStore, SqliteTokenStore, TokenAuthority, TokenError, TokenId, TokenType,
};
