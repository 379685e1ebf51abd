// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tracker_ticks_total", "Refresh ticks started, all sources.");
        describe_counter!(
            "tracker_fetch_errors_total",
            "Ticks abandoned on a fetch/decode failure."
        );
        describe_counter!(
            "tracker_vehicles_changed_total",
            "Ticks on which at least one vehicle moved."
        );
        describe_gauge!("tracker_listeners", "Currently registered snapshot listeners.");
        describe_gauge!(
            "tracker_refresh_interval_secs",
            "Current polling interval per agency."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder. Call once, before the scheduler
    /// starts ticking.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        ensure_metrics_described();
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
