//! Bounded per-crane ring buffer of recent telemetry pulses.
//!
//! Two locks instead of one: the ring (`VecDeque`) and the cached
//! "latest" pulse are guarded independently so that readers of
//! `latest()` never contend with the (larger) history scan that
//! `candidates_near()` does.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::pulse::TelemetryPulse;

pub struct PulseBuffer {
    capacity: usize,
    history: RwLock<VecDeque<TelemetryPulse>>,
    latest: RwLock<Option<TelemetryPulse>>,
}

impl PulseBuffer {
    pub fn new(capacity: usize) -> Self {
        PulseBuffer {
            capacity,
            history: RwLock::new(VecDeque::with_capacity(capacity)),
            latest: RwLock::new(None),
        }
    }

    /// Appends a pulse, evicting the oldest entry by insertion order
    /// once at capacity. Updates the "latest" view only if this pulse's
    /// `source_ts_ns` is strictly newer than the current latest's —
    /// out-of-order arrivals are recorded into history but never lower
    /// the externally observable latest.
    pub fn insert(&self, pulse: TelemetryPulse) {
        {
            let mut history = self.history.write();
            if history.len() >= self.capacity {
                history.pop_front();
            }
            history.push_back(pulse);
        }

        let mut latest = self.latest.write();
        let is_newer = match *latest {
            Some(current) => pulse.source_ts_ns > current.source_ts_ns,
            None => true,
        };
        if is_newer {
            *latest = Some(pulse);
        }
    }

    /// The pulse with the maximum `source_ts_ns` ever ingested, or
    /// `None` if the buffer is empty.
    pub fn latest(&self) -> Option<TelemetryPulse> {
        *self.latest.read()
    }

    /// Candidates whose adjusted timestamp (via `adjust`) falls within
    /// `window` nanoseconds of `near`.
    pub fn candidates_near(
        &self,
        near: i64,
        window: i64,
        adjust: impl Fn(&TelemetryPulse) -> i64,
    ) -> Vec<TelemetryPulse> {
        self.history
            .read()
            .iter()
            .filter(|p| (adjust(p) - near).abs() <= window)
            .copied()
            .collect()
    }

    /// All pulses currently retained, oldest first.
    pub fn history(&self) -> Vec<TelemetryPulse> {
        self.history.read().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the buffer and the latest view (called on service `reset()`).
    pub fn clear(&self) {
        self.history.write().clear();
        *self.latest.write() = None;
    }
}
