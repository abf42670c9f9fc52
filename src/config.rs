//! Construction-time configuration.
//!
//! Loading these values from a file or environment is an external
//! collaborator's job — this module only models the validated,
//! in-memory shape.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which thread runs the safety pipeline after `ingest()` writes a
/// pulse into its buffer.
///
/// Both regimes satisfy the 10ms processing-window budget when the
/// motor-controller port is non-blocking, but only `InlineIngest` gives
/// a deterministic worst-case latency under adversarial scheduling.
/// `ingest_sync` always behaves like `InlineIngest` regardless of this
/// setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionRegime {
    /// Alignment, evaluation, and dispatch run synchronously on the
    /// calling `ingest()` thread.
    InlineIngest,
    /// The pulse is handed off to a dedicated worker thread; simpler
    /// buffering, but worst-case latency is no longer bounded solely
    /// by the ingest call.
    DispatchedIngest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Tilt delta, in millimeters, strictly above which a lift faults.
    /// Exactly this value is safe.
    pub tilt_threshold_mm: f64,
    /// Alignment deltas above this many nanoseconds are stale.
    pub max_alignment_window_ns: i64,
    /// Per-crane silence duration, in nanoseconds, after which the
    /// liveness watchdog fires.
    pub liveness_timeout_ns: i64,
    /// End-to-end budget, in nanoseconds, from threshold crossing to
    /// `HALT_ALL` dispatch.
    pub processing_window_ns: i64,
    /// Ring buffer capacity per crane. Recommended >= 64.
    pub buffer_capacity: usize,
    /// How often the watchdog's background timer scans for silence.
    pub watchdog_check_interval_ns: i64,
    pub execution_regime: ExecutionRegime,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            tilt_threshold_mm: 100.0,
            max_alignment_window_ns: 100_000_000,
            liveness_timeout_ns: 150_000_000,
            processing_window_ns: 10_000_000,
            buffer_capacity: 64,
            watchdog_check_interval_ns: 10_000_000,
            execution_regime: ExecutionRegime::InlineIngest,
        }
    }
}

impl SystemConfig {
    /// Validates the configuration, failing fast at construction time
    /// rather than letting a malformed config surface as a runtime
    /// panic deep in the safety pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tilt_threshold_mm <= 0.0 {
            return Err(ConfigError::NonPositiveTiltThreshold);
        }
        if self.max_alignment_window_ns <= 0 {
            return Err(ConfigError::NonPositiveAlignmentWindow);
        }
        if self.liveness_timeout_ns <= 0 {
            return Err(ConfigError::NonPositiveLivenessTimeout);
        }
        if self.processing_window_ns <= 0 {
            return Err(ConfigError::NonPositiveProcessingWindow);
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        if self.watchdog_check_interval_ns <= 0 {
            return Err(ConfigError::NonPositiveWatchdogInterval);
        }
        Ok(())
    }
}
