// src/feed/mod.rs
pub mod http;

use anyhow::Result;

pub use self::http::HttpFeed;

/// One decoded feed entity, reduced to the fields the tracker cares about.
/// Either field may be absent; such entities are dropped during the diff.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedVehicle {
    pub id: Option<String>,
    pub position: Option<LatLon>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// A source of vehicle positions. The scheduler only depends on this trait,
/// so tests substitute scripted feeds for the HTTP implementation.
#[async_trait::async_trait]
pub trait VehicleFeed: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<FeedVehicle>>;
    fn name(&self) -> &str;
}
