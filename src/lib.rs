// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod broadcast;
pub mod config;
pub mod feed;
pub mod interval;
pub mod metrics;
pub mod scheduler;
pub mod snapshot;
pub mod source;
pub mod vehicle;

// ---- Re-exports for stable public API ----
pub use crate::broadcast::{Broadcaster, ListenerId, SnapshotListener};
pub use crate::config::AppConfig;
pub use crate::feed::{FeedVehicle, HttpFeed, LatLon, VehicleFeed};
pub use crate::scheduler::{SchedulerCfg, Tracker};
pub use crate::snapshot::{Snapshot, SourceSnapshot};
pub use crate::source::{Source, SourceRegistry};
pub use crate::vehicle::{Vehicle, VehicleStore};
