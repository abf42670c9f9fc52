//! Per-crane liveness watchdog.
//!
//! The background timer is a plain `std::thread::spawn` loop gated by
//! an `Arc<AtomicBool>` run flag and joined on `stop()`, generalized
//! from "one loop per process" to "one loop per watchdog instance" so
//! tests can create and tear down many independently.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use crate::pulse::CraneId;

/// Invoked when a crane has gone silent for longer than the configured
/// liveness timeout. A plain function-typed sink rather than an owned
/// reference back to the service, so the watchdog has no idea who's
/// listening.
pub type TimeoutSink = Arc<dyn Fn(CraneId) + Send + Sync>;

struct CraneLiveness {
    last_update_ns: AtomicI64,
    timed_out: AtomicBool,
}

impl CraneLiveness {
    fn new(now_ns: i64) -> Self {
        CraneLiveness {
            last_update_ns: AtomicI64::new(now_ns),
            timed_out: AtomicBool::new(false),
        }
    }
}

pub struct LivenessWatchdog {
    timeout_ns: i64,
    check_interval: Duration,
    reference: Instant,
    a: Arc<CraneLiveness>,
    b: Arc<CraneLiveness>,
    running: Arc<AtomicBool>,
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl LivenessWatchdog {
    pub fn new(timeout_ns: i64, check_interval_ns: i64) -> Self {
        let reference = Instant::now();
        LivenessWatchdog {
            timeout_ns,
            check_interval: Duration::from_nanos(check_interval_ns.max(0) as u64),
            reference,
            a: Arc::new(CraneLiveness::new(0)),
            b: Arc::new(CraneLiveness::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            handle: parking_lot::Mutex::new(None),
        }
    }

    fn now_ns(&self) -> i64 {
        self.reference.elapsed().as_nanos() as i64
    }

    fn crane(&self, id: CraneId) -> &Arc<CraneLiveness> {
        match id {
            CraneId::A => &self.a,
            CraneId::B => &self.b,
        }
    }

    /// Clears `timed_out` and refreshes the last-update stamp.
    pub fn record_update(&self, id: CraneId) {
        let now = self.now_ns();
        let crane = self.crane(id);
        crane.last_update_ns.store(now, Ordering::Relaxed);
        crane.timed_out.store(false, Ordering::Relaxed);
    }

    pub fn timed_out(&self, id: CraneId) -> bool {
        self.crane(id).timed_out.load(Ordering::Relaxed)
    }

    /// Arms both cranes' grace period and spawns the background timer
    /// thread. A no-op if already running.
    pub fn start(&self, sink: TimeoutSink) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let now = self.now_ns();
        self.a.last_update_ns.store(now, Ordering::Relaxed);
        self.a.timed_out.store(false, Ordering::Relaxed);
        self.b.last_update_ns.store(now, Ordering::Relaxed);
        self.b.timed_out.store(false, Ordering::Relaxed);

        let running = self.running.clone();
        let a = self.a.clone();
        let b = self.b.clone();
        let timeout_ns = self.timeout_ns;
        let check_interval = self.check_interval;
        let reference = self.reference;

        let join = thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let now = reference.elapsed().as_nanos() as i64;
                for (id, crane) in [(CraneId::A, &a), (CraneId::B, &b)] {
                    let last = crane.last_update_ns.load(Ordering::Relaxed);
                    if now - last > timeout_ns && !crane.timed_out.swap(true, Ordering::SeqCst) {
                        debug!("[watchdog] liveness timeout on crane {}", id);
                        sink(id);
                    }
                }
                thread::sleep(check_interval);
            }
        });

        *self.handle.lock() = Some(join);
    }

    /// Stops the background timer and clears all liveness state.
    pub fn reset(&self) {
        self.stop();
        self.a.last_update_ns.store(0, Ordering::Relaxed);
        self.a.timed_out.store(false, Ordering::Relaxed);
        self.b.last_update_ns.store(0, Ordering::Relaxed);
        self.b.timed_out.store(false, Ordering::Relaxed);
    }

    /// Stops the background timer, joining it before returning.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LivenessWatchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
