//! GTFS-realtime Vehicle Tracker — Binary Entrypoint
//! Loads configuration, starts the refresh scheduler, and serves the HTTP
//! and WebSocket surface.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gtfs_rt_tracker::api::{self, AppState};
use gtfs_rt_tracker::config::{AppConfig, USAGE};
use gtfs_rt_tracker::feed::{HttpFeed, VehicleFeed};
use gtfs_rt_tracker::metrics::Metrics;
use gtfs_rt_tracker::scheduler::{SchedulerCfg, Tracker};
use gtfs_rt_tracker::source::{Source, SourceRegistry};
use gtfs_rt_tracker::Broadcaster;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gtfs_rt_tracker=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli_path = std::env::args().nth(1);
    let cfg = match AppConfig::load(cli_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Fatal at startup: usage and out, before the scheduler exists.
            eprintln!("config error: {e:#}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    let port = match cfg.effective_port() {
        Ok(port) => port,
        Err(e) => {
            eprintln!("config error: {e:#}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let metrics = Metrics::init();

    let mut registry = SourceRegistry::new();
    for source_cfg in &cfg.sources {
        registry.add(Source::from_config(source_cfg));
    }
    let registry = Arc::new(registry);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let feeds: Vec<Arc<dyn VehicleFeed>> = registry
        .list()
        .iter()
        .map(|s| {
            Arc::new(HttpFeed::new(client.clone(), s.agency.clone(), s.url.clone()))
                as Arc<dyn VehicleFeed>
        })
        .collect();

    let broadcaster = Broadcaster::new();
    let tracker = Arc::new(Tracker::new(
        Arc::clone(&registry),
        broadcaster.clone(),
        SchedulerCfg {
            min_refresh_secs: cfg.min_refresh,
            dynamic_refresh: cfg.dynamic_refresh,
        },
    ));
    Arc::clone(&tracker).start(feeds);
    tracing::info!(
        sources = registry.len(),
        min_refresh = cfg.min_refresh,
        dynamic_refresh = cfg.dynamic_refresh,
        "tracker started"
    );

    let state = AppState {
        registry,
        broadcaster,
    };
    let router = api::create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracker.stop();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = ?e, "ctrl-c handler failed");
    }
}
