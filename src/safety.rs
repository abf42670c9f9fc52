//! Tilt-threshold safety evaluation.

use crate::aligner::AlignedPair;

/// Applies the tilt-threshold rule to an aligned pair. Stateless by
/// design — timestamp bookkeeping for "when did we first cross" lives
/// in `LiftStateMachine`, not here, so this evaluator can be called
/// freely without itself needing to be the source of truth for
/// one-shot semantics.
pub struct SafetyEvaluator {
    tilt_threshold_mm: f64,
}

impl SafetyEvaluator {
    pub fn new(tilt_threshold_mm: f64) -> Self {
        SafetyEvaluator { tilt_threshold_mm }
    }

    /// `true` iff the pair's tilt delta is strictly greater than the
    /// threshold. Exactly the threshold value is safe.
    pub fn is_violation(&self, pair: &AlignedPair) -> bool {
        pair.tilt_delta_mm > self.tilt_threshold_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::{CraneId, TelemetryPulse};

    fn pair(tilt_mm: f64) -> AlignedPair {
        let a = TelemetryPulse::new(CraneId::A, tilt_mm, 0, 0).unwrap();
        let b = TelemetryPulse::new(CraneId::B, 0.0, 0, 0).unwrap();
        AlignedPair {
            pulse_a: a,
            pulse_b: b,
            alignment_delta_ns: 0,
            tilt_delta_mm: tilt_mm,
        }
    }

    #[test]
    fn exactly_threshold_is_safe() {
        let eval = SafetyEvaluator::new(100.0);
        assert!(!eval.is_violation(&pair(100.0)));
    }

    #[test]
    fn single_ulp_above_threshold_faults() {
        let eval = SafetyEvaluator::new(100.0);
        assert!(eval.is_violation(&pair(100.0 + f64::EPSILON * 100.0)));
        assert!(eval.is_violation(&pair(100.1)));
    }

    #[test]
    fn below_threshold_is_safe() {
        let eval = SafetyEvaluator::new(100.0);
        assert!(!eval.is_violation(&pair(80.0)));
    }
}
