// src/feed/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use gtfs_rt::FeedMessage;
use prost::Message;

use super::{FeedVehicle, LatLon, VehicleFeed};

/// GTFS-realtime feed fetched over HTTP and decoded from protobuf.
pub struct HttpFeed {
    agency: String,
    url: String,
    client: reqwest::Client,
}

impl HttpFeed {
    pub fn new(client: reqwest::Client, agency: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            url: url.into(),
            client,
        }
    }

    fn project(feed: FeedMessage) -> Vec<FeedVehicle> {
        let mut out = Vec::with_capacity(feed.entity.len());
        for entity in feed.entity {
            // Entities without a vehicle payload (trip updates, alerts) are
            // not candidates at all.
            let Some(vehicle) = entity.vehicle else {
                continue;
            };
            let id = if entity.id.is_empty() {
                None
            } else {
                Some(entity.id)
            };
            let position = vehicle.position.map(|p| LatLon {
                latitude: p.latitude as f64,
                longitude: p.longitude as f64,
            });
            out.push(FeedVehicle { id, position });
        }
        out
    }
}

#[async_trait]
impl VehicleFeed for HttpFeed {
    async fn fetch_latest(&self) -> Result<Vec<FeedVehicle>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("fetching {}", self.url))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("fetching {}", self.url))?;
        let body = resp.bytes().await.context("reading feed body")?;

        let feed = FeedMessage::decode(&*body).context("decoding gtfs-realtime feed")?;
        Ok(Self::project(feed))
    }

    fn name(&self) -> &str {
        &self.agency
    }
}
