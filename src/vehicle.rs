// src/vehicle.rs
use std::collections::HashMap;

use serde::Serialize;

use crate::feed::FeedVehicle;

/// Last-known position of one tracked vehicle within a source's feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_update_ms: i64,
}

/// Per-source map of vehicle id to last-known position.
///
/// Vehicles are never evicted: one absent from a later feed simply goes
/// stale but keeps its last position and timestamp.
#[derive(Debug, Default)]
pub struct VehicleStore {
    vehicles: HashMap<String, Vehicle>,
}

impl VehicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Current contents sorted by vehicle id, so consecutive snapshots of an
    /// unchanged store serialize identically.
    pub fn to_sorted_vec(&self) -> Vec<Vehicle> {
        let mut out: Vec<Vehicle> = self.vehicles.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Fold one tick's decoded entities into the store.
    ///
    /// An entity missing either id or position is skipped, not an error.
    /// A candidate whose coordinates differ (exact comparison) from the
    /// stored entry, or that has no stored entry, is written with
    /// `now_ms` as its timestamp. Identical coordinates keep the previous
    /// timestamp untouched.
    ///
    /// Returns true if any vehicle changed this tick.
    pub fn apply(&mut self, entities: &[FeedVehicle], now_ms: i64) -> bool {
        let mut changed = false;
        for entity in entities {
            let (Some(id), Some(pos)) = (entity.id.as_deref(), entity.position) else {
                continue;
            };
            match self.vehicles.get(id) {
                Some(existing)
                    if existing.latitude == pos.latitude
                        && existing.longitude == pos.longitude =>
                {
                    // Unchanged coordinates: carry the old timestamp forward.
                }
                _ => {
                    self.vehicles.insert(
                        id.to_string(),
                        Vehicle {
                            id: id.to_string(),
                            latitude: pos.latitude,
                            longitude: pos.longitude,
                            last_update_ms: now_ms,
                        },
                    );
                    changed = true;
                }
            }
        }
        changed
    }
}
