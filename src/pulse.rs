//! Telemetry pulses and the two-element crane identifier space.

use serde::{Deserialize, Serialize};

/// Identifies one of the two cranes in the tandem lift.
///
/// The set is closed by construction: there is no way to name a third
/// crane, which is the "closed two-element set" invariant on
/// `TelemetryPulse::crane_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CraneId {
    A,
    B,
}

impl CraneId {
    /// The other crane in the pair.
    pub fn other(self) -> CraneId {
        match self {
            CraneId::A => CraneId::B,
            CraneId::B => CraneId::A,
        }
    }
}

impl std::fmt::Display for CraneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CraneId::A => write!(f, "A"),
            CraneId::B => write!(f, "B"),
        }
    }
}

/// One vertical-position telemetry sample from a crane.
///
/// Immutable once constructed. `source_ts_ns` is the producer's own
/// clock; `arrival_ts_ns` is stamped by the ingest path on the
/// orchestrator's monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPulse {
    pub crane_id: CraneId,
    pub z_axis_mm: f64,
    pub source_ts_ns: i64,
    pub arrival_ts_ns: i64,
}

impl TelemetryPulse {
    /// Constructs a pulse, rejecting negative timestamps.
    pub fn new(
        crane_id: CraneId,
        z_axis_mm: f64,
        source_ts_ns: i64,
        arrival_ts_ns: i64,
    ) -> Result<Self, crate::error::ConfigError> {
        if source_ts_ns < 0 || arrival_ts_ns < 0 {
            return Err(crate::error::ConfigError::NegativeTimestamp);
        }
        Ok(TelemetryPulse {
            crane_id,
            z_axis_mm,
            source_ts_ns,
            arrival_ts_ns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crane_id_other_is_involution() {
        assert_eq!(CraneId::A.other(), CraneId::B);
        assert_eq!(CraneId::B.other(), CraneId::A);
        assert_eq!(CraneId::A.other().other(), CraneId::A);
    }

    #[test]
    fn rejects_negative_timestamps() {
        assert!(TelemetryPulse::new(CraneId::A, 100.0, -1, 0).is_err());
        assert!(TelemetryPulse::new(CraneId::A, 100.0, 0, -1).is_err());
        assert!(TelemetryPulse::new(CraneId::A, 100.0, 0, 0).is_ok());
    }
}
