//! TTL-based challenge garbage collection.
//!
//! Abandoned challenges are benign unconsumed records; this periodic sweep
//! keeps the store bounded without touching the request path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error};

use super::store::ChallengeStore;

const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

#[must_use]
pub const fn default_sweep_interval() -> Duration {
    Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECONDS)
}

/// Spawn the background sweep loop.
///
/// Errors are logged and the loop keeps running; a transient store outage
/// only delays cleanup, it never stops it.
pub fn spawn_reaper(store: Arc<dyn ChallengeStore>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match store.delete_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "reaped expired wallet challenges"),
                Err(err) => error!("challenge reaper sweep failed: {err}"),
            }
        }
    });
}
