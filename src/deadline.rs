//! Per-request deadlines for remote store and account lookups.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Default budget for a single request's store and lookup calls.
pub const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(5);

/// Marker returned when an operation outlives its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    /// Name of the operation that was cut off.
    pub operation: &'static str,
}

/// Point in time by which a request's remote calls must complete.
///
/// One deadline is shared by every call a request makes, so a slow first call
/// leaves less time for the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    /// No deadline; calls run until the store answers.
    #[must_use]
    pub fn none() -> Self {
        Self { at: None }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Runs `future`, cutting it off when the deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`Elapsed`] naming `operation` if the deadline passes first.
    pub async fn run<F, T>(&self, operation: &'static str, future: F) -> Result<T, Elapsed>
    where
        F: Future<Output = T>,
    {
        match self.at {
            Some(at) => tokio::time::timeout_at(at, future)
                .await
                .map_err(|_| Elapsed { operation }),
            None => Ok(future.await),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::after(DEFAULT_REQUEST_DEADLINE)
    }
}
