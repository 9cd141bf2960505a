//! Retry policy for failed notification fetches.
//!
//! Failed fetches are retried after a delay drawn uniformly from a fixed
//! window, so many clients failing together do not retry in lockstep.

use std::time::Duration;

use rand::Rng;

use crate::config::SyncSettings;
use crate::error::SyncError;

/// Jittered retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Shortest retry delay in seconds.
    pub min_backoff_secs: f64,
    /// Longest retry delay in seconds.
    pub max_backoff_secs: f64,
}

impl RetryPolicy {
    /// Create a new RetryPolicy from configuration settings.
    pub fn new(settings: &SyncSettings) -> Self {
        Self {
            min_backoff_secs: settings.retry_min_secs,
            max_backoff_secs: settings.retry_max_secs,
        }
    }

    /// Draw the delay before the next attempt.
    pub fn backoff<R: Rng>(&self, rng: &mut R) -> Duration {
        let min = self.min_backoff_secs.max(0.0);
        let max = self.max_backoff_secs.max(min);
        let secs = if max > min {
            rng.random_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }

    /// Check if polling should keep going after this error.
    ///
    /// Only transient failures are retried. A rejected session, a request the
    /// server refuses, or a broken payload would fail the same way again.
    pub fn should_retry(&self, error: &SyncError) -> bool {
        error.is_retryable()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_backoff_secs: 3.0,
            max_backoff_secs: 8.0,
        }
    }
}
