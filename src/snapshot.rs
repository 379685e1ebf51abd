// src/snapshot.rs
use serde::Serialize;

use crate::vehicle::Vehicle;

/// One source's slice of a snapshot: agency label, display hue, and the
/// full current vehicle set.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub agency: String,
    pub hue: f64,
    pub vehicles: Vec<Vehicle>,
}

/// Full point-in-time view of all sources, delivered to listeners after
/// every successful tick, a heartbeat rather than a delta.
pub type Snapshot = Vec<SourceSnapshot>;
