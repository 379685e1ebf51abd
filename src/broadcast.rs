// src/broadcast.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use metrics::gauge;

use crate::snapshot::Snapshot;

/// Receives every snapshot. Implementations must return quickly: hand the
/// snapshot off to a channel or a task rather than doing work inline, since
/// delivery runs on a refresh task's tick.
pub trait SnapshotListener: Send + Sync {
    fn handle_snapshot(&self, snapshot: &Snapshot);
}

/// Handle for removing a listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Fan-out of snapshots to a dynamically-mutable listener set.
///
/// Delivery iterates over a clone of the set taken under the read lock, so
/// add/remove may run concurrently with an in-progress delivery: a listener
/// added mid-delivery only sees subsequent snapshots, one removed
/// mid-delivery may or may not see the in-flight one.
#[derive(Clone, Default)]
pub struct Broadcaster {
    listeners: Arc<RwLock<Vec<(ListenerId, Arc<dyn SnapshotListener>)>>>,
    next_id: Arc<AtomicU64>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn SnapshotListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.write().expect("listener set lock poisoned");
        listeners.push((id, listener));
        gauge!("tracker_listeners").set(listeners.len() as f64);
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        let mut listeners = self.listeners.write().expect("listener set lock poisoned");
        listeners.retain(|(lid, _)| *lid != id);
        gauge!("tracker_listeners").set(listeners.len() as f64);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().expect("listener set lock poisoned").len()
    }

    pub fn broadcast(&self, snapshot: &Snapshot) {
        // Stable view: clone the set, then deliver without holding the lock.
        let listeners: Vec<Arc<dyn SnapshotListener>> = self
            .listeners
            .read()
            .expect("listener set lock poisoned")
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener.handle_snapshot(snapshot);
        }
    }
}
