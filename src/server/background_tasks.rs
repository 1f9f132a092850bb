//! Background task startup functions
//!
//! Contains the periodic aggregate state snapshot task.

use placeboard_canvas::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Start the periodic snapshot task
///
/// Writes the full state every `interval` whether or not it changed, and
/// once more when `shutdown` is cancelled.
pub fn start_snapshot_task(
    store: &Arc<StateStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let store = store.clone();
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match store.persist().await {
                        Ok(()) => {
                            let pixels_placed = store.pixels_placed().await;
                            info!(pixels_placed, "Snapshot written");
                        }
                        Err(e) => warn!(error = %e, "Snapshot failed"),
                    }
                }
                _ = shutdown.cancelled() => {
                    if let Err(e) = store.persist().await {
                        warn!(error = %e, "Final snapshot failed");
                    }
                    info!("Snapshot task shutting down");
                    break;
                }
            }
        }
    });
    info!("Snapshot task started ({}s interval)", interval.as_secs());
    handle
}
