//! End-to-end scenarios for `TandemSyncService`, run against a fake
//! motor-controller port standing in for real hardware, the way an
//! in-process fake network/clock pair exercises a control loop without
//! a real socket or OS clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;

use tandem_crane_sync::{
    Command, CraneId, DispatchError, FaultEvent, FaultListener, LiftState, MotorControllerPort,
    SystemConfig, TandemSyncService, TelemetryPulse,
};

static LOG_INIT: Once = Once::new();

fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Records every command it receives instead of talking to real hardware.
struct RecordingPort {
    crane_id: CraneId,
    commands: Mutex<Vec<Command>>,
}

impl RecordingPort {
    fn new(crane_id: CraneId) -> Self {
        RecordingPort {
            crane_id,
            commands: Mutex::new(Vec::new()),
        }
    }

    fn received(&self, cmd: Command) -> bool {
        self.commands.lock().unwrap().iter().any(|c| *c == cmd)
    }

    fn halt_count(&self) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == Command::HaltAll)
            .count()
    }
}

impl MotorControllerPort for RecordingPort {
    fn send_command(&self, cmd: Command) -> Result<(), DispatchError> {
        self.commands.lock().unwrap().push(cmd);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn crane_id(&self) -> CraneId {
        self.crane_id
    }
}

fn pulse(crane: CraneId, z_mm: f64, ts_ns: i64) -> TelemetryPulse {
    TelemetryPulse::new(crane, z_mm, ts_ns, ts_ns).unwrap()
}

fn harness() -> (Arc<TandemSyncService>, Arc<RecordingPort>, Arc<RecordingPort>) {
    init_logging();
    let port_a = Arc::new(RecordingPort::new(CraneId::A));
    let port_b = Arc::new(RecordingPort::new(CraneId::B));
    let service = TandemSyncService::new(
        SystemConfig::default(),
        port_a.clone(),
        port_b.clone(),
        None,
    )
    .expect("default config is valid");
    (service, port_a, port_b)
}

/// Scenario 1: continuous ascent drift. A climbs at 100mm/s, B at
/// 80mm/s, pulses every 50ms. Safe through t=5.0s (tilt=100), faults at
/// t=5.05s (tilt=101) with `HALT_ALL` observed at both ports.
#[test]
fn continuous_ascent_drift_faults_past_the_boundary() {
    let (service, port_a, port_b) = harness();
    service.start();

    let mut t_ms: i64 = 0;
    while t_ms <= 5_000 {
        let t_s = t_ms as f64 / 1000.0;
        service.ingest_sync(pulse(CraneId::A, 100.0 * t_s, t_ms * 1_000_000));
        service.ingest_sync(pulse(CraneId::B, 80.0 * t_s, t_ms * 1_000_000));
        t_ms += 50;
    }
    assert_eq!(service.state(), LiftState::Lifting);
    assert!(!port_a.received(Command::HaltAll));

    let t_ms = 5_050;
    let t_s = t_ms as f64 / 1000.0;
    service.ingest_sync(pulse(CraneId::A, 100.0 * t_s, t_ms * 1_000_000));
    service.ingest_sync(pulse(CraneId::B, 80.0 * t_s, t_ms * 1_000_000));

    assert_eq!(service.state(), LiftState::Fault);
    assert!(port_a.received(Command::HaltAll));
    assert!(port_b.received(Command::HaltAll));
    assert!(service.was_processing_within_window());
}

/// Scenario 2: pre-threshold safety. Same drift, only the first 4s are
/// ingested — tilt never reaches the threshold, so LIFTING holds and no
/// halt is ever issued.
#[test]
fn pre_threshold_drift_never_faults() {
    let (service, port_a, port_b) = harness();
    service.start();

    let mut t_ms: i64 = 0;
    while t_ms <= 4_000 {
        let t_s = t_ms as f64 / 1000.0;
        service.ingest_sync(pulse(CraneId::A, 100.0 * t_s, t_ms * 1_000_000));
        service.ingest_sync(pulse(CraneId::B, 80.0 * t_s, t_ms * 1_000_000));
        t_ms += 50;
    }

    assert_eq!(service.state(), LiftState::Lifting);
    let pair = service.aligned_pair().expect("pair computed");
    assert!((pair.tilt_delta_mm - 80.0).abs() < 1e-6);
    assert_eq!(port_a.halt_count(), 0);
    assert_eq!(port_b.halt_count(), 0);
}

/// Scenario 3: exact boundary. 100.0mm tilt is safe, 100.1mm faults.
#[test]
fn exact_boundary_tilt_is_safe_above_it_faults() {
    let (service, _port_a, _port_b) = harness();
    service.start();

    service.ingest_sync(pulse(CraneId::A, 500.0, 5_000_000_000));
    service.ingest_sync(pulse(CraneId::B, 400.0, 5_000_000_000));
    assert_eq!(service.state(), LiftState::Lifting);

    service.ingest_sync(pulse(CraneId::A, 500.1, 5_050_000_000));
    service.ingest_sync(pulse(CraneId::B, 400.0, 5_050_000_000));
    assert_eq!(service.state(), LiftState::Fault);
}

/// Scenario 4: liveness fault. A keeps updating, B goes silent; after
/// the configured timeout the fault listener fires with a reason
/// containing "timeout" and both ports receive `HALT_ALL`.
#[test]
fn liveness_timeout_on_silent_crane_faults_with_timeout_reason() {
    init_logging();
    let mut config = SystemConfig::default();
    config.liveness_timeout_ns = 60_000_000; // 60ms, so the test doesn't wait 150ms
    config.watchdog_check_interval_ns = 5_000_000;

    let port_a = Arc::new(RecordingPort::new(CraneId::A));
    let port_b = Arc::new(RecordingPort::new(CraneId::B));

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = fired.clone();
    let last_reason: Arc<Mutex<String>> = Arc::new(Mutex::new(String::new()));
    let last_reason_clone = last_reason.clone();

    let listener: FaultListener = Arc::new(move |event: FaultEvent| {
        fired_clone.fetch_add(1, Ordering::SeqCst);
        *last_reason_clone.lock().unwrap() = event.reason;
    });

    let service = TandemSyncService::new(config, port_a.clone(), port_b.clone(), Some(listener))
        .expect("valid config");
    service.start();

    service.ingest_sync(pulse(CraneId::A, 0.0, 0));
    service.ingest_sync(pulse(CraneId::B, 0.0, 0));

    for i in 1..=10 {
        service.ingest_sync(pulse(CraneId::A, 0.0, i * 25_000_000));
        thread::sleep(std::time::Duration::from_millis(25));
    }
    thread::sleep(std::time::Duration::from_millis(100));

    assert_eq!(service.state(), LiftState::Fault);
    assert!(fired.load(Ordering::SeqCst) >= 1);
    assert!(last_reason.lock().unwrap().contains("timeout"));
    assert!(port_a.received(Command::HaltAll));
    assert!(port_b.received(Command::HaltAll));
}

/// Scenario 5: FAULT -> reset -> MOVE. A rejected MOVE while FAULT, a
/// successful one once the lift has been reset and restarted with fresh
/// aligned data.
#[test]
fn move_rejected_in_fault_accepted_after_reset() {
    let (service, port_a, _port_b) = harness();
    service.start();

    service.ingest_sync(pulse(CraneId::A, 200.0, 0));
    service.ingest_sync(pulse(CraneId::B, 0.0, 0));
    assert_eq!(service.state(), LiftState::Fault);

    let accepted = service.execute_command(Command::Move {
        crane_id: CraneId::A,
        delta_mm: 50.0,
    });
    assert!(!accepted);
    assert!(!port_a.received(Command::Move {
        crane_id: CraneId::A,
        delta_mm: 50.0,
    }));

    service.reset();
    assert_eq!(service.state(), LiftState::Idle);
    assert!(service.start());
    assert_eq!(service.state(), LiftState::Lifting);

    service.ingest_sync(pulse(CraneId::A, 10.0, 10_000_000));
    service.ingest_sync(pulse(CraneId::B, 10.0, 10_000_000));

    let accepted = service.execute_command(Command::Move {
        crane_id: CraneId::A,
        delta_mm: 50.0,
    });
    assert!(accepted);
    assert!(port_a.received(Command::Move {
        crane_id: CraneId::A,
        delta_mm: 50.0,
    }));
}

/// Scenario 6: clock-offset calibration resolves an apparent alignment
/// gap without disturbing LIFTING.
#[test]
fn clock_offset_calibration_keeps_lift_aligned() {
    let (service, _port_a, _port_b) = harness();
    service.start();

    service.calibrate_clock_offset(1_050_000_000, 1_000_000_000);
    assert!(service.is_clock_offset_calibrated());
    assert_eq!(service.clock_offset_ns(), 50_000_000);

    let pa = pulse(CraneId::A, 0.0, 2_050_000_000);
    assert_eq!(service.adjusted_timestamp(&pa), 2_000_000_000);

    service.ingest_sync(pa);
    service.ingest_sync(pulse(CraneId::B, 0.0, 2_000_000_000));

    assert!(!service.is_stale_data_detected());
    assert_eq!(service.state(), LiftState::Lifting);
}

/// Scenario 7: concurrency. 10,000 ingests from 4 threads complete well
/// under 5s and leave the service in a consistent final state.
#[test]
fn concurrent_ingest_from_multiple_threads_completes_quickly() {
    let (service, _port_a, _port_b) = harness();
    service.start();

    let start = std::time::Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|thread_idx| {
            let service = service.clone();
            thread::spawn(move || {
                for i in 0..2_500i64 {
                    let crane = if thread_idx % 2 == 0 { CraneId::A } else { CraneId::B };
                    let ts = (thread_idx as i64 * 2_500 + i) * 1_000_000;
                    let jitter_mm: f64 = rand::random::<f64>() * 0.01;
                    service.ingest(pulse(crane, 1.0 + jitter_mm, ts));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert!(start.elapsed() < std::time::Duration::from_secs(5));
    assert!(matches!(
        service.state(),
        LiftState::Lifting | LiftState::Fault
    ));
}
