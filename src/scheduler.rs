// src/scheduler.rs
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use tokio::task::JoinHandle;

use crate::broadcast::Broadcaster;
use crate::feed::VehicleFeed;
use crate::interval::IntervalController;
use crate::source::SourceRegistry;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerCfg {
    pub min_refresh_secs: u64,
    pub dynamic_refresh: bool,
}

/// Owns one self-rescheduling refresh task per source.
///
/// Each task is the sole writer of its source's interval, timestamp and
/// vehicle store. The next run is armed only after the current run
/// finishes, so ticks for one source never overlap, however slow the
/// network is; across sources ticks are unordered.
pub struct Tracker {
    registry: Arc<SourceRegistry>,
    broadcaster: Broadcaster,
    controller: IntervalController,
    dynamic_refresh: bool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Tracker {
    pub fn new(registry: Arc<SourceRegistry>, broadcaster: Broadcaster, cfg: SchedulerCfg) -> Self {
        Self {
            registry,
            broadcaster,
            controller: IntervalController::new(cfg.min_refresh_secs),
            dynamic_refresh: cfg.dynamic_refresh,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Spawn the refresh loop for every source. `feeds` is index-aligned
    /// with the registry.
    pub fn start(self: Arc<Self>, feeds: Vec<Arc<dyn VehicleFeed>>) {
        assert_eq!(
            feeds.len(),
            self.registry.len(),
            "one feed per registered source"
        );
        let mut tasks = self.tasks.lock().expect("task list lock poisoned");
        for (id, feed) in feeds.into_iter().enumerate() {
            let tracker = Arc::clone(&self);
            tasks.push(tokio::spawn(async move {
                tracker.run_refresh_loop(id, feed).await;
            }));
        }
    }

    async fn run_refresh_loop(&self, id: usize, feed: Arc<dyn VehicleFeed>) {
        loop {
            let Some(source) = self.registry.get(id) else {
                return;
            };
            // Re-arm from the current interval each time around; a failed
            // tick just comes back at the same cadence.
            let delay = source.refresh_secs();
            tokio::time::sleep(Duration::from_secs(delay)).await;
            self.run_once(id, feed.as_ref(), Utc::now().timestamp_millis())
                .await;
        }
    }

    /// One tick for one source: fetch, diff, adapt, broadcast.
    ///
    /// A fetch or decode failure is logged and skips everything else,
    /// broadcast included, leaving the store and interval exactly as they
    /// were. Returns whether any vehicle changed.
    pub async fn run_once(&self, id: usize, feed: &dyn VehicleFeed, now_ms: i64) -> bool {
        let Some(source) = self.registry.get(id) else {
            return false;
        };
        counter!("tracker_ticks_total").increment(1);
        tracing::info!(source = id, agency = %source.agency, "refreshing vehicle positions");

        let entities = match feed.fetch_latest().await {
            Ok(entities) => entities,
            Err(e) => {
                counter!("tracker_fetch_errors_total").increment(1);
                tracing::warn!(
                    source = id,
                    agency = %source.agency,
                    error = ?e,
                    "error refreshing vehicle positions"
                );
                return false;
            }
        };

        let updated = {
            let mut state = source.state();
            let updated = state.vehicles.apply(&entities, now_ms);
            if updated {
                tracing::info!(
                    source = id,
                    vehicles = state.vehicles.len(),
                    "vehicles updated"
                );
                counter!("tracker_vehicles_changed_total").increment(1);
                if self.dynamic_refresh {
                    self.controller.on_update(&mut state, now_ms);
                    gauge!("tracker_refresh_interval_secs", "agency" => source.agency.clone())
                        .set(state.refresh_secs as f64);
                }
            }
            updated
            // state lock must drop before snapshot() re-locks this source
        };

        let snapshot = self.registry.snapshot();
        self.broadcaster.broadcast(&snapshot);
        updated
    }

    /// Global shutdown: stop all pending reschedules and make a best
    /// effort to interrupt in-flight fetches.
    pub fn stop(&self) {
        let mut tasks = self.tasks.lock().expect("task list lock poisoned");
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop();
    }
}
