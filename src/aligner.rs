//! Temporal alignment: picks the closest cross-crane pulse pair.

use crate::buffer::PulseBuffer;
use crate::clock_offset::ClockSkewCalibrator;
use crate::pulse::TelemetryPulse;

/// A matched cross-crane pulse pair with derived deltas. Transient —
/// recomputed on demand, never stored across calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPair {
    pub pulse_a: TelemetryPulse,
    pub pulse_b: TelemetryPulse,
    pub alignment_delta_ns: i64,
    pub tilt_delta_mm: f64,
}

impl AlignedPair {
    fn new(pulse_a: TelemetryPulse, pulse_b: TelemetryPulse, calibrator: &ClockSkewCalibrator) -> Self {
        let adj_a = calibrator.adjust(&pulse_a);
        let adj_b = calibrator.adjust(&pulse_b);
        AlignedPair {
            pulse_a,
            pulse_b,
            alignment_delta_ns: (adj_a - adj_b).abs(),
            tilt_delta_mm: (pulse_a.z_axis_mm - pulse_b.z_axis_mm).abs(),
        }
    }

    fn adjusted_sum(&self, calibrator: &ClockSkewCalibrator) -> i64 {
        calibrator.adjust(&self.pulse_a) + calibrator.adjust(&self.pulse_b)
    }
}

/// Selects the closest temporal pair between the two buffers: take
/// each side's latest pulse, scan the other buffer for its best match,
/// and keep whichever of the two candidate pairs has the smaller
/// alignment delta. Ties prefer the more recent pair (larger sum of
/// adjusted timestamps).
pub struct Aligner {
    max_alignment_window_ns: i64,
}

impl Aligner {
    pub fn new(max_alignment_window_ns: i64) -> Self {
        Aligner {
            max_alignment_window_ns,
        }
    }

    /// Returns the best aligned pair, or `None` if either buffer is empty.
    pub fn align(
        &self,
        buffer_a: &PulseBuffer,
        buffer_b: &PulseBuffer,
        calibrator: &ClockSkewCalibrator,
    ) -> Option<AlignedPair> {
        let latest_a = buffer_a.latest()?;
        let latest_b = buffer_b.latest()?;

        let mut candidates = Vec::new();

        let adj_latest_a = calibrator.adjust(&latest_a);
        if let Some(best_b) = Self::closest(buffer_b, adj_latest_a, calibrator) {
            candidates.push(AlignedPair::new(latest_a, best_b, calibrator));
        }

        let adj_latest_b = calibrator.adjust(&latest_b);
        if let Some(best_a) = Self::closest(buffer_a, adj_latest_b, calibrator) {
            candidates.push(AlignedPair::new(best_a, latest_b, calibrator));
        }

        candidates.into_iter().min_by(|x, y| {
            x.alignment_delta_ns
                .cmp(&y.alignment_delta_ns)
                .then_with(|| y.adjusted_sum(calibrator).cmp(&x.adjusted_sum(calibrator)))
        })
    }

    /// Whether the last-computed pair (or any pair with this alignment
    /// delta) is stale — advisory only, never itself a fault.
    pub fn is_stale(&self, pair: &AlignedPair) -> bool {
        pair.alignment_delta_ns > self.max_alignment_window_ns
    }

    fn closest(
        buffer: &PulseBuffer,
        near: i64,
        calibrator: &ClockSkewCalibrator,
    ) -> Option<TelemetryPulse> {
        buffer.history().into_iter().min_by(|x, y| {
            let dx = (calibrator.adjust(x) - near).abs();
            let dy = (calibrator.adjust(y) - near).abs();
            dx.cmp(&dy)
                .then_with(|| calibrator.adjust(y).cmp(&calibrator.adjust(x)))
        })
    }
}
