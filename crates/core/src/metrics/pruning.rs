//! Optional background pruning
//!
//! Writes already prune the buffer they touch. Operations that stop
//! receiving events keep their last window until something sweeps them; this
//! task does that on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use bulwark_common::resilience::Clock;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::MetricsCollector;

/// Spawn a task calling [`MetricsCollector::prune`] every `interval`
///
/// The task stops when `shutdown` is cancelled. Returns `None` when no Tokio
/// runtime is available.
pub fn spawn_pruning_task<C: Clock>(
    collector: Arc<MetricsCollector<C>>,
    interval: Duration,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = Handle::try_current() else {
        warn!("Skipping metrics pruning task start: no active Tokio runtime detected");
        return None;
    };

    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    collector.prune();
                }
            }
        }
        debug!("Metrics pruning task stopped");
    }))
}
