//! Typed error surface. `ConfigError` guards construction; `DispatchError`
//! is the only error that can escape the safety-interlock hot path.
//!
//! Everything else (`StaleData`, `CommandRejected`,
//! `OutOfOrderPulse`) is not an error at all — it's a `bool` or a flag,
//! never a `Result::Err`.

use crate::pulse::CraneId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timestamps must be non-negative")]
    NegativeTimestamp,
    #[error("tilt threshold must be positive")]
    NonPositiveTiltThreshold,
    #[error("max alignment window must be positive")]
    NonPositiveAlignmentWindow,
    #[error("liveness timeout must be positive")]
    NonPositiveLivenessTimeout,
    #[error("processing window must be positive")]
    NonPositiveProcessingWindow,
    #[error("buffer capacity must be at least 1")]
    ZeroBufferCapacity,
    #[error("watchdog check interval must be positive")]
    NonPositiveWatchdogInterval,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("motor controller port for crane {0} is disconnected")]
    PortDisconnected(CraneId),
}

/// The reason a lift transitioned into FAULT. `Display` for
/// `LivenessTimeout` always contains the substring `"timeout"`, which
/// is the contract callers are expected to match on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaultReason {
    SafetyViolation { tilt_mm: f64 },
    LivenessTimeout { crane: CraneId },
}

impl std::fmt::Display for FaultReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultReason::SafetyViolation { tilt_mm } => {
                write!(f, "tilt delta {:.1}mm exceeded safety threshold", tilt_mm)
            }
            FaultReason::LivenessTimeout { crane } => {
                write!(f, "liveness timeout on crane {}", crane)
            }
        }
    }
}
