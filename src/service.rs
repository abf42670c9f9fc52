//! `TandemSyncService` — orchestrates ingest, alignment, safety
//! evaluation, and atomic halt dispatch across the two cranes.
//!
//! This is the crate's central struct: it owns every other component
//! and exposes the entire public control surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::aligner::{Aligner, AlignedPair};
use crate::buffer::PulseBuffer;
use crate::clock_offset::ClockSkewCalibrator;
use crate::config::{ExecutionRegime, SystemConfig};
use crate::dispatcher::CommandDispatcher;
use crate::error::{ConfigError, FaultReason};
use crate::motor::{Command, MotorControllerPort};
use crate::pulse::{CraneId, TelemetryPulse};
use crate::safety::SafetyEvaluator;
use crate::state::{LiftState, LiftStateMachine, SafetyTimestamps};
use crate::watchdog::LivenessWatchdog;

/// Delivered to the fault listener installed at construction time.
#[derive(Debug, Clone)]
pub struct FaultEvent {
    pub reason: String,
    pub crane: Option<CraneId>,
    pub threshold_crossed_ns: i64,
}

pub type FaultListener = Arc<dyn Fn(FaultEvent) + Send + Sync>;

struct DispatchWorker {
    sender: mpsc::Sender<()>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

pub struct TandemSyncService {
    config: SystemConfig,
    reference: Instant,
    buffer_a: PulseBuffer,
    buffer_b: PulseBuffer,
    calibrator: ClockSkewCalibrator,
    aligner: Aligner,
    safety: SafetyEvaluator,
    watchdog: LivenessWatchdog,
    state: LiftStateMachine,
    dispatcher: CommandDispatcher,
    fault_listener: Option<FaultListener>,
    last_alignment: Mutex<Option<(AlignedPair, bool)>>,
    shutdown: AtomicBool,
    dispatch_worker: Mutex<Option<DispatchWorker>>,
}

impl TandemSyncService {
    /// Constructs the service, validating `config` and failing fast at
    /// build time rather than panicking later in the safety pipeline.
    pub fn new(
        config: SystemConfig,
        port_a: Arc<dyn MotorControllerPort>,
        port_b: Arc<dyn MotorControllerPort>,
        fault_listener: Option<FaultListener>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        let service = Arc::new(TandemSyncService {
            buffer_a: PulseBuffer::new(config.buffer_capacity),
            buffer_b: PulseBuffer::new(config.buffer_capacity),
            calibrator: ClockSkewCalibrator::new(),
            aligner: Aligner::new(config.max_alignment_window_ns),
            safety: SafetyEvaluator::new(config.tilt_threshold_mm),
            watchdog: LivenessWatchdog::new(config.liveness_timeout_ns, config.watchdog_check_interval_ns),
            state: LiftStateMachine::new(),
            dispatcher: CommandDispatcher::new(port_a, port_b),
            fault_listener,
            last_alignment: Mutex::new(None),
            shutdown: AtomicBool::new(false),
            dispatch_worker: Mutex::new(None),
            reference: Instant::now(),
            config,
        });

        // `DispatchedIngest` needs the worker thread wired up with a
        // weak back-reference to the service, which requires the `Arc`
        // to exist first — hence filling in `dispatch_worker` through
        // its mutex after construction rather than at literal-build time.
        if service.config.execution_regime == ExecutionRegime::DispatchedIngest {
            let (tx, rx) = mpsc::channel::<()>();
            let running = Arc::new(AtomicBool::new(true));
            let running_clone = running.clone();
            let weak = Arc::downgrade(&service);
            let handle = thread::spawn(move || {
                while running_clone.load(Ordering::SeqCst) {
                    match rx.recv_timeout(Duration::from_millis(5)) {
                        Ok(()) => {
                            if let Some(svc) = weak.upgrade() {
                                svc.process_pipeline();
                            }
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
            });
            *service.dispatch_worker.lock() = Some(DispatchWorker {
                sender: tx,
                running,
                handle: Mutex::new(Some(handle)),
            });
        }

        Ok(service)
    }

    fn now_ns(&self) -> i64 {
        self.reference.elapsed().as_nanos() as i64
    }

    fn buffer_for(&self, crane: CraneId) -> &PulseBuffer {
        match crane {
            CraneId::A => &self.buffer_a,
            CraneId::B => &self.buffer_b,
        }
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Non-blocking; silently drops the pulse once `shutdown()` has
    /// been called. Runs the safety pipeline inline or hands it to the
    /// dispatch worker depending on `config.execution_regime`.
    pub fn ingest(&self, pulse: TelemetryPulse) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        self.buffer_for(pulse.crane_id).insert(pulse);
        self.watchdog.record_update(pulse.crane_id);

        let dispatched = self
            .dispatch_worker
            .lock()
            .as_ref()
            .map(|worker| worker.sender.send(()).is_ok())
            .unwrap_or(false);
        if !dispatched {
            self.process_pipeline();
        }
    }

    /// Always completes the full pipeline (alignment, evaluation, and
    /// — on violation — dispatch) on the calling thread before
    /// returning, regardless of `config.execution_regime`. Intended for
    /// deterministic tests.
    pub fn ingest_sync(&self, pulse: TelemetryPulse) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        self.buffer_for(pulse.crane_id).insert(pulse);
        self.watchdog.record_update(pulse.crane_id);
        self.process_pipeline();
    }

    fn process_pipeline(&self) {
        let pair = self.aligner.align(&self.buffer_a, &self.buffer_b, &self.calibrator);
        let Some(pair) = pair else { return };
        let stale = self.aligner.is_stale(&pair);
        *self.last_alignment.lock() = Some((pair, stale));

        if self.state.state() != LiftState::Lifting {
            return;
        }
        if self.safety.is_violation(&pair) {
            self.enter_fault(FaultReason::SafetyViolation {
                tilt_mm: pair.tilt_delta_mm,
            });
        }
    }

    // ------------------------------------------------------------------
    // Fault path
    // ------------------------------------------------------------------

    fn on_liveness_timeout(&self, crane: CraneId) {
        if self.state.state() != LiftState::Lifting {
            return;
        }
        self.enter_fault(FaultReason::LivenessTimeout { crane });
    }

    /// Stamps `threshold_crossed_ns`, transitions LIFTING -> FAULT,
    /// stamps `halt_issued_ns`, and dispatches `HALT_ALL` — in that
    /// order. A concurrent second violator observes
    /// `trigger_fault` return `None` and does nothing further.
    fn enter_fault(&self, reason: FaultReason) {
        let crossed_ns = match self.state.trigger_fault(self.now_ns()) {
            Some(ns) => ns,
            None => return,
        };
        warn!("FAULT: {}", reason);

        self.state.stamp_halt_issued(self.now_ns());

        if let Err(e) = self.dispatcher.dispatch_halt_all() {
            warn!("HALT_ALL dispatch error (remaining in FAULT): {}", e);
        }

        if let Some(listener) = &self.fault_listener {
            let crane = match reason {
                FaultReason::LivenessTimeout { crane } => Some(crane),
                FaultReason::SafetyViolation { .. } => None,
            };
            listener(FaultEvent {
                reason: reason.to_string(),
                crane,
                threshold_crossed_ns: crossed_ns,
            });
        }
    }

    // ------------------------------------------------------------------
    // Control surface
    // ------------------------------------------------------------------

    /// IDLE -> LIFTING. No-op if already LIFTING. Arms the liveness
    /// watchdog's grace period.
    pub fn start(self: &Arc<Self>) -> bool {
        let armed = self.state.start();
        if armed {
            let weak = Arc::downgrade(self);
            self.watchdog.start(Arc::new(move |crane_id| {
                if let Some(svc) = weak.upgrade() {
                    svc.on_liveness_timeout(crane_id);
                }
            }));
        }
        armed
    }

    /// LIFTING/FAULT -> IDLE. Clears buffers, safety timestamps, and
    /// the watchdog. Clock-offset calibration is sticky and survives
    /// this call.
    pub fn reset(&self) {
        self.state.reset();
        self.buffer_a.clear();
        self.buffer_b.clear();
        self.watchdog.reset();
        *self.last_alignment.lock() = None;
        info!("reset: lift -> IDLE");
    }

    /// Admits `cmd` only when LIFTING, both cranes are live (no
    /// liveness timeout flagged), and the last computed alignment is
    /// non-stale. Never raises an exception for ordinary rejection —
    /// callers get a plain `bool`.
    pub fn execute_command(&self, cmd: Command) -> bool {
        if self.state.state() != LiftState::Lifting {
            return false;
        }
        if self.watchdog.timed_out(CraneId::A) || self.watchdog.timed_out(CraneId::B) {
            return false;
        }
        let fresh_and_aligned = match &*self.last_alignment.lock() {
            Some((_, stale)) => !stale,
            None => false,
        };
        if !fresh_and_aligned {
            return false;
        }

        match cmd {
            Command::HaltAll => self.dispatcher.dispatch_halt_all().is_ok(),
            Command::Move { crane_id, delta_mm } => {
                self.dispatcher.dispatch_move(crane_id, delta_mm).is_ok()
            }
        }
    }

    /// Terminates the watchdog and (in `DispatchedIngest` mode) the
    /// dispatch worker within the 100ms shutdown budget, and
    /// makes subsequent `ingest`/`ingest_sync` calls no-ops.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.watchdog.stop();
        if let Some(worker) = &*self.dispatch_worker.lock() {
            worker.running.store(false, Ordering::SeqCst);
            if let Some(handle) = worker.handle.lock().take() {
                let _ = handle.join();
            }
        }
        debug!("shutdown complete");
    }

    pub fn calibrate_clock_offset(&self, a_ts_ns: i64, b_ts_ns: i64) {
        self.calibrator.calibrate(a_ts_ns, b_ts_ns);
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    pub fn state(&self) -> LiftState {
        self.state.state()
    }

    pub fn latest_pulse(&self, crane: CraneId) -> Option<TelemetryPulse> {
        self.buffer_for(crane).latest()
    }

    pub fn aligned_pair(&self) -> Option<AlignedPair> {
        self.last_alignment.lock().map(|(pair, _)| pair)
    }

    pub fn is_stale_data_detected(&self) -> bool {
        self.last_alignment.lock().map(|(_, stale)| stale).unwrap_or(false)
    }

    fn timestamps(&self) -> SafetyTimestamps {
        self.state.timestamps()
    }

    pub fn threshold_crossed_ts(&self) -> Option<i64> {
        self.timestamps().threshold_crossed_ns
    }

    pub fn halt_issued_ts(&self) -> Option<i64> {
        self.timestamps().halt_issued_ns
    }

    pub fn processing_time_ns(&self) -> Option<i64> {
        let ts = self.timestamps();
        match (ts.threshold_crossed_ns, ts.halt_issued_ns) {
            (Some(crossed), Some(issued)) => Some(issued - crossed),
            _ => None,
        }
    }

    pub fn was_processing_within_window(&self) -> bool {
        match self.processing_time_ns() {
            Some(ns) => ns <= self.config.processing_window_ns,
            None => false,
        }
    }

    pub fn is_clock_offset_calibrated(&self) -> bool {
        self.calibrator.is_calibrated()
    }

    pub fn clock_offset_ns(&self) -> i64 {
        self.calibrator.offset_ns()
    }

    pub fn adjusted_timestamp(&self, pulse: &TelemetryPulse) -> i64 {
        self.calibrator.adjust(pulse)
    }
}

impl Drop for TandemSyncService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
