//! Realtime synchronization and safety interlock orchestrator for
//! tandem-lift gantry cranes.
//!
//! [`service::TandemSyncService`] is the entry point: it wires the rest
//! of this crate's modules (telemetry ingest, clock-skew calibration,
//! temporal alignment, liveness watchdog, safety evaluation, the lift
//! state machine, and motor-controller dispatch) into one orchestrator.

pub mod aligner;
pub mod buffer;
pub mod clock_offset;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod motor;
pub mod pulse;
pub mod safety;
pub mod service;
pub mod state;
pub mod watchdog;

pub use config::{ExecutionRegime, SystemConfig};
pub use error::{ConfigError, DispatchError, FaultReason};
pub use motor::{Command, MotorControllerPort};
pub use pulse::{CraneId, TelemetryPulse};
pub use service::{FaultEvent, FaultListener, TandemSyncService};
pub use state::LiftState;
