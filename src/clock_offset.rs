//! Clock-skew calibration between the two cranes' producer clocks.
//!
//! `offset_ns` and `calibrated` are guarded under a single lock so a
//! reader of `adjust()` never observes one updated without the other.

use parking_lot::RwLock;

use crate::pulse::{CraneId, TelemetryPulse};

struct Offset {
    offset_ns: i64,
    calibrated: bool,
}

pub struct ClockSkewCalibrator {
    state: RwLock<Offset>,
}

impl Default for ClockSkewCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSkewCalibrator {
    pub fn new() -> Self {
        ClockSkewCalibrator {
            state: RwLock::new(Offset {
                offset_ns: 0,
                calibrated: false,
            }),
        }
    }

    /// Records a paired sample and sets `offset_ns = a_ts_ns - b_ts_ns`,
    /// marking the calibrator as calibrated. May be called again at any
    /// time — including after `reset()` — to recalibrate; there is no
    /// separate `recalibrate` method because this one already serves
    /// that role unconditionally.
    pub fn calibrate(&self, a_ts_ns: i64, b_ts_ns: i64) {
        let mut state = self.state.write();
        state.offset_ns = a_ts_ns - b_ts_ns;
        state.calibrated = true;
    }

    /// Maps a pulse's `source_ts_ns` onto crane B's timebase: crane A
    /// timestamps are shifted by the offset, crane B timestamps pass
    /// through unchanged.
    pub fn adjust(&self, pulse: &TelemetryPulse) -> i64 {
        match pulse.crane_id {
            CraneId::A => pulse.source_ts_ns - self.offset_ns(),
            CraneId::B => pulse.source_ts_ns,
        }
    }

    pub fn offset_ns(&self) -> i64 {
        self.state.read().offset_ns
    }

    pub fn is_calibrated(&self) -> bool {
        self.state.read().calibrated
    }

    /// Sticky across `reset()` — see `clear()` below, which deliberately
    /// does *not* call this.
    pub fn clear(&self) {
        // Intentionally a no-op: calibration survives `TandemSyncService::reset()`.
        // Kept as an explicit method so the "sticky by design" decision has
        // a place to live rather than being an absence callers have to infer.
    }
}
