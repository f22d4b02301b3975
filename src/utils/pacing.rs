//! Request pacing for rate-limited services.
//!
//! NCBI asks clients without an API key to stay under three requests per
//! second; the searcher waits on a [`Pacer`] after every query.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// Pause between successive requests to one service
pub const ENTREZ_QUERY_INTERVAL: Duration = Duration::from_secs(1);

#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait until the next request may be issued
    async fn pause(&self);
}

/// Sleeps for a fixed interval on every call
#[derive(Debug, Clone, Copy)]
pub struct FixedIntervalPacer {
    interval: Duration,
}

impl FixedIntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// No delay at all
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FixedIntervalPacer {
    fn default() -> Self {
        Self::new(ENTREZ_QUERY_INTERVAL)
    }
}

#[async_trait]
impl Pacer for FixedIntervalPacer {
    async fn pause(&self) {
        if !self.interval.is_zero() {
            sleep(self.interval).await;
        }
    }
}
