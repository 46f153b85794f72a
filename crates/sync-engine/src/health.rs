//! Connectivity monitor.
//!
//! Probes the server's health endpoint. The first healthy probe after an
//! outage marks the engine synced and pulls the section list; after that
//! the monitor keeps polling. Consecutive failures are retried at a fixed
//! delay until the retry budget is spent, then the monitor stops.

use crate::engine::EngineInner;
use crate::status::SyncStatus;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub(crate) fn spawn_connectivity_monitor(engine: Arc<EngineInner>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let settings = engine.settings;
        let mut healthy = false;
        let mut failures: u32 = 0;

        loop {
            match engine.remote.health().await {
                Ok(()) => {
                    if !healthy {
                        if failures > 0 {
                            info!(previous_failures = failures, "Server reachable again");
                        }
                        healthy = true;
                        failures = 0;
                        engine.status.set(SyncStatus::Synced);
                        if let Err(e) = engine.fetch_sections().await {
                            engine.report("fetch_sections", e);
                        }
                    }
                    sleep(settings.health_poll_interval).await;
                }
                Err(e) => {
                    healthy = false;
                    failures = failures.saturating_add(1);
                    engine.status.set(SyncStatus::Offline);

                    if failures >= settings.health_max_retries {
                        warn!(
                            failures,
                            error = %e,
                            "Server unreachable, connectivity monitor giving up"
                        );
                        break;
                    }
                    warn!(
                        failure_count = failures,
                        next_check_ms = settings.health_retry_delay.as_millis(),
                        error = %e,
                        "Health probe failed"
                    );
                    sleep(settings.health_retry_delay).await;
                }
            }
        }

        debug!("Connectivity monitor stopped");
    })
}
