// src/interval.rs
use crate::source::SourceState;

/// Recomputes a source's polling interval from the time between observed
/// feed changes. Invoked only on ticks where at least one vehicle changed
/// and dynamic refresh is enabled.
///
/// The heuristic samples the elapsed time since the previous observed
/// change and halves it, so the source ends up polled at roughly twice the
/// rate the upstream feed actually updates, floored at the operator's
/// configured minimum.
#[derive(Debug, Clone, Copy)]
pub struct IntervalController {
    pub min_refresh_secs: u64,
}

impl IntervalController {
    pub fn new(min_refresh_secs: u64) -> Self {
        Self { min_refresh_secs }
    }

    /// Apply the adaptation to one source's state at `now_ms`.
    ///
    /// The first observed change only records the timestamp; there is no
    /// prior sample to measure against, so the cadence stays put.
    pub fn on_update(&self, state: &mut SourceState, now_ms: i64) {
        if let Some(last_ms) = state.last_refresh_ms {
            // Integer seconds, halved. A clock step backwards clamps to
            // zero and the floor lifts it back to the minimum.
            let proposed = ((now_ms - last_ms).max(0) / 2_000) as u64;
            state.refresh_secs = self.min_refresh_secs.max(proposed);
            tracing::debug!(
                proposed,
                interval = state.refresh_secs,
                "refresh interval adapted"
            );
        }
        state.last_refresh_ms = Some(now_ms);
    }
}
