// tests/scheduler_loop.rs
//
// The refresh loop itself, under paused tokio time: first tick waits the
// configured interval, failed ticks reschedule at the same cadence, ticks
// for one source never overlap however slow the fetch is, and stop() halts
// everything.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use gtfs_rt_tracker::feed::{FeedVehicle, LatLon, VehicleFeed};
use gtfs_rt_tracker::scheduler::{SchedulerCfg, Tracker};
use gtfs_rt_tracker::snapshot::Snapshot;
use gtfs_rt_tracker::source::{Source, SourceRegistry};
use gtfs_rt_tracker::{Broadcaster, SnapshotListener};

/// Instrumented feed for loop tests: counts calls, tracks in-flight
/// overlap, optionally sleeps inside the fetch, fails every other call, or
/// moves the vehicle on every call.
#[derive(Default)]
struct LoopFeed {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    fail_even_calls: bool,
    moving: bool,
}

impl LoopFeed {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VehicleFeed for LoopFeed {
    async fn fetch_latest(&self) -> Result<Vec<FeedVehicle>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let entered = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(entered, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_even_calls && n % 2 == 0 {
            return Err(anyhow!("connection reset"));
        }
        let latitude = if self.moving { n as f64 } else { 47.6 };
        Ok(vec![FeedVehicle {
            id: Some("a".to_string()),
            position: Some(LatLon {
                latitude,
                longitude: -122.33,
            }),
        }])
    }

    fn name(&self) -> &str {
        "loop"
    }
}

#[derive(Default)]
struct CountingListener {
    delivered: AtomicUsize,
}

impl SnapshotListener for CountingListener {
    fn handle_snapshot(&self, _snapshot: &Snapshot) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
    }
}

fn build(
    sources: Vec<(u64, &str)>,
    cfg: SchedulerCfg,
    broadcaster: Broadcaster,
) -> Arc<Tracker> {
    let mut registry = SourceRegistry::new();
    for (refresh_secs, agency) in sources {
        registry.add(Source::new(
            agency,
            "http://example.com/feed.pb",
            refresh_secs,
        ));
    }
    Arc::new(Tracker::new(Arc::new(registry), broadcaster, cfg))
}

const LOCKED: SchedulerCfg = SchedulerCfg {
    min_refresh_secs: 5,
    dynamic_refresh: false,
};

#[tokio::test(start_paused = true)]
async fn first_tick_waits_for_the_configured_interval() {
    let tracker = build(vec![(15, "Metro")], LOCKED, Broadcaster::new());
    let feed = Arc::new(LoopFeed::default());
    tracker.clone().start(vec![feed.clone()]);

    tokio::time::sleep(Duration::from_secs(14)).await;
    assert_eq!(feed.calls(), 0, "ticked before the interval elapsed");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(feed.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_ticks_reschedule_at_the_same_cadence() {
    let broadcaster = Broadcaster::new();
    let listener = Arc::new(CountingListener::default());
    broadcaster.add_listener(listener.clone());

    let tracker = build(vec![(10, "Metro")], LOCKED, broadcaster);
    let feed = Arc::new(LoopFeed {
        fail_even_calls: true,
        ..Default::default()
    });
    tracker.clone().start(vec![feed.clone()]);

    // Ticks at t=10 (fail), t=20 (ok), t=30 (fail).
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(feed.calls(), 3, "failure must not stop the cadence");
    assert_eq!(
        listener.delivered.load(Ordering::SeqCst),
        1,
        "only the successful tick broadcasts"
    );
    let source = tracker.registry().get(0).unwrap();
    assert_eq!(source.state().vehicles.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_fetches_never_overlap_for_one_source() {
    let tracker = build(vec![(10, "Metro")], LOCKED, Broadcaster::new());
    let feed = Arc::new(LoopFeed {
        delay: Duration::from_secs(25),
        ..Default::default()
    });
    tracker.clone().start(vec![feed.clone()]);

    // Fetch takes 25s against a 10s interval: t=10..35, t=45..70.
    tokio::time::sleep(Duration::from_secs(78)).await;
    assert_eq!(feed.calls(), 2);
    assert_eq!(
        feed.max_in_flight.load(Ordering::SeqCst),
        1,
        "ticks for one source overlapped"
    );
}

#[tokio::test(start_paused = true)]
async fn sources_tick_independently() {
    let tracker = build(vec![(10, "A"), (15, "B")], LOCKED, Broadcaster::new());
    let feed_a = Arc::new(LoopFeed::default());
    let feed_b = Arc::new(LoopFeed::default());
    tracker.clone().start(vec![feed_a.clone(), feed_b.clone()]);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(feed_a.calls(), 3, "A ticks at 10, 20, 30");
    assert_eq!(feed_b.calls(), 2, "B ticks at 15, 30");
}

#[tokio::test(start_paused = true)]
async fn adapted_interval_drives_the_next_reschedule() {
    let tracker = build(
        vec![(30, "Metro")],
        SchedulerCfg {
            min_refresh_secs: 5,
            dynamic_refresh: true,
        },
        Broadcaster::new(),
    );
    let feed = Arc::new(LoopFeed {
        moving: true,
        ..Default::default()
    });
    tracker.clone().start(vec![feed.clone()]);

    // Tick 1 at t=30 bootstraps; tick 2 at t=60 adapts. Wall-clock time
    // barely moves under the paused runtime, so the elapsed sample is ~0
    // and the interval falls to the floor; ticks then come every 5s.
    tokio::time::sleep(Duration::from_secs(76)).await;
    let source = tracker.registry().get(0).unwrap();
    assert_eq!(source.state().refresh_secs, 5);
    assert_eq!(feed.calls(), 5, "t=30, 60, 65, 70, 75");
}

#[tokio::test(start_paused = true)]
async fn stop_halts_all_reschedules() {
    let tracker = build(vec![(15, "Metro")], LOCKED, Broadcaster::new());
    let feed = Arc::new(LoopFeed::default());
    tracker.clone().start(vec![feed.clone()]);

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(feed.calls(), 1);

    tracker.stop();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(feed.calls(), 1, "stopped tracker kept ticking");
}
