// src/source.rs
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::SourceConfig;
use crate::snapshot::{Snapshot, SourceSnapshot};
use crate::vehicle::VehicleStore;

/// The part of a source its refresh task mutates on every tick. Only that
/// task writes it; other tasks read it when projecting a snapshot, so it
/// sits behind a (practically uncontended) mutex.
#[derive(Debug)]
pub struct SourceState {
    /// Current polling interval, seconds. Invariant: >= the configured
    /// minimum whenever the interval controller has touched it.
    pub refresh_secs: u64,
    /// When the feed last produced an observed change. `None` = never.
    pub last_refresh_ms: Option<i64>,
    pub vehicles: VehicleStore,
}

/// One configured GTFS-realtime feed endpoint plus its adaptive polling
/// state.
#[derive(Debug)]
pub struct Source {
    pub agency: String,
    pub url: String,
    /// Display hue in [0,1), consumed by the map UI.
    pub hue: f64,
    state: Mutex<SourceState>,
}

impl Source {
    pub fn new(agency: impl Into<String>, url: impl Into<String>, refresh_secs: u64) -> Self {
        Self {
            agency: agency.into(),
            url: url.into(),
            hue: rand::random(),
            state: Mutex::new(SourceState {
                refresh_secs,
                last_refresh_ms: None,
                vehicles: VehicleStore::new(),
            }),
        }
    }

    pub fn with_hue(mut self, hue: f64) -> Self {
        self.hue = sanitize_hue(hue);
        self
    }

    pub fn from_config(cfg: &SourceConfig) -> Self {
        let source = Self::new(cfg.agency.clone(), cfg.url.clone(), cfg.refresh_rate);
        match cfg.hue {
            Some(hue) => source.with_hue(hue),
            None => source,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().expect("source state lock poisoned")
    }

    pub fn refresh_secs(&self) -> u64 {
        self.state().refresh_secs
    }
}

/// Hues outside (0,1), including integral values like 0, carry no usable
/// fraction and are replaced with a fresh random hue, so the stored value
/// is always in [0,1).
pub fn sanitize_hue(hue: f64) -> f64 {
    if hue > 0.0 && hue < 1.0 {
        hue
    } else {
        rand::random()
    }
}

/// Ordered collection of sources. Populated once at startup, read
/// concurrently by every refresh task afterwards; there is no removal.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: Source) {
        self.sources.push(Arc::new(source));
    }

    pub fn get(&self, id: usize) -> Option<&Arc<Source>> {
        self.sources.get(id)
    }

    pub fn list(&self) -> &[Arc<Source>] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Point-in-time view of every source and its vehicles, in registry
    /// order. Each source is locked just long enough to clone its store.
    pub fn snapshot(&self) -> Snapshot {
        self.sources
            .iter()
            .map(|source| {
                let state = source.state();
                SourceSnapshot {
                    agency: source.agency.clone(),
                    hue: source.hue,
                    vehicles: state.vehicles.to_sorted_vec(),
                }
            })
            .collect()
    }
}
