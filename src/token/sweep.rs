//! Periodic removal of expired tokens.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::deadline::Deadline;

use super::TokenAuthority;

/// Spawns a task that sweeps expired tokens every `interval`.
///
/// Failures are logged and the loop keeps going. Abort the returned handle to stop it.
pub fn spawn_sweeper(authority: TokenAuthority, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match authority.sweep_expired(&Deadline::default()).await {
                Ok(removed) => debug!(removed, "Token sweep finished"),
                Err(error) => warn!(
                    error = %error,
                    transient = error.is_transient(),
                    "Token sweep failed"
                ),
            }
        }
    })
}
