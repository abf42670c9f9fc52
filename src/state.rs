//! IDLE/LIFTING/FAULT state machine with safety timestamp bookkeeping.
//!
//! State and the safety timestamp pair are guarded by one
//! `parking_lot::Mutex` so the transition into FAULT and the stamping
//! of `threshold_crossed_ns`/`halt_issued_ns` are a single critical
//! section: no reader can observe `state() == FAULT` without the
//! timestamps already being in place. This trades lock-free CAS for a
//! short critical section in exchange for that atomicity guarantee.

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftState {
    Idle,
    Lifting,
    Fault,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SafetyTimestamps {
    pub threshold_crossed_ns: Option<i64>,
    pub halt_issued_ns: Option<i64>,
}

struct Inner {
    state: LiftState,
    timestamps: SafetyTimestamps,
}

pub struct LiftStateMachine {
    inner: Mutex<Inner>,
}

impl Default for LiftStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LiftStateMachine {
    pub fn new() -> Self {
        LiftStateMachine {
            inner: Mutex::new(Inner {
                state: LiftState::Idle,
                timestamps: SafetyTimestamps::default(),
            }),
        }
    }

    pub fn state(&self) -> LiftState {
        self.inner.lock().state
    }

    pub fn timestamps(&self) -> SafetyTimestamps {
        self.inner.lock().timestamps
    }

    /// IDLE -> LIFTING. A no-op (but still `true`, since the desired
    /// state is already reached) if already LIFTING.
    pub fn start(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            LiftState::Idle => {
                inner.state = LiftState::Lifting;
                true
            }
            LiftState::Lifting => true,
            LiftState::Fault => false,
        }
    }

    /// LIFTING/FAULT -> IDLE, clearing the safety timestamps. Rejected
    /// from IDLE only in the sense that there's nothing to do; this
    /// returns `true` for any state since IDLE is always the terminal
    /// result a caller wants from `reset()`.
    pub fn reset(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.state = LiftState::Idle;
        inner.timestamps = SafetyTimestamps::default();
        true
    }

    /// Attempts LIFTING -> FAULT, stamping `threshold_crossed_ns` under
    /// the same critical section. Returns `Some(threshold_crossed_ns)`
    /// only for the call that actually performed the transition; a
    /// concurrent second violator sees `None` and must not re-dispatch.
    pub fn trigger_fault(&self, now_ns: i64) -> Option<i64> {
        let mut inner = self.inner.lock();
        if inner.state != LiftState::Lifting {
            return None;
        }
        inner.state = LiftState::Fault;
        inner.timestamps.threshold_crossed_ns = Some(now_ns);
        Some(now_ns)
    }

    /// Stamps `halt_issued_ns`, called after `trigger_fault` succeeds
    /// and before the `HALT_ALL` command is actually sent, so the
    /// 10ms budget measures the full orchestrator path.
    pub fn stamp_halt_issued(&self, now_ns: i64) {
        let mut inner = self.inner.lock();
        if inner.timestamps.halt_issued_ns.is_none() {
            inner.timestamps.halt_issued_ns = Some(now_ns);
        }
    }
}
