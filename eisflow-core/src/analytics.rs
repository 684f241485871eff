//! Streaming analytics over accepted samples
//!
//! The engine is invoked exactly once per accepted sample, in strict
//! arrival order, and updates four running statistics: last voltage, last
//! impedance, running mean impedance and accepted-sample count. The update
//! sequence is order-sensitive:
//!
//! 1. voltage delta against the previous accepted voltage
//! 2. impedance delta against the previous accepted impedance
//! 3. fold the current impedance into the running mean
//! 4. deviation-band check against the updated mean
//! 5. remember the current impedance for the next delta
//!
//! Step 3 runs before step 4, so the band is evaluated against a mean that
//! already contains the current observation. This dampens sensitivity to
//! single outliers and is an intentional property of the algorithm, not an
//! artifact of this implementation.

use heapless::Vec;

use crate::events::Direction;
use crate::sample::{Sample, SessionDescriptor};

/// Upper bound on detections a single sample can raise: one voltage spike,
/// one impedance jump, one band excursion.
pub const MAX_DETECTIONS: usize = 3;

/// Detections raised while folding one sample in.
pub type Detections = Vec<Detection, MAX_DETECTIONS>;

/// Session-scoped running statistics.
///
/// `running_mean_impedance` is the arithmetic mean of the impedance
/// magnitude over all accepted samples so far, maintained incrementally
/// and never recomputed from history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    /// Voltage of the most recent accepted sample.
    pub last_voltage: Option<f64>,
    /// Impedance magnitude of the most recent accepted sample.
    pub last_impedance: Option<f64>,
    /// Incremental mean impedance over accepted samples.
    pub running_mean_impedance: f64,
    /// Number of accepted samples folded in so far.
    pub accepted: u64,
}

/// One threshold crossing detected while folding a sample in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    /// `|ΔV|` exceeded the voltage threshold.
    VoltageSpike {
        /// Signed voltage change.
        delta: f64,
        /// Previous accepted voltage.
        previous: f64,
        /// Current voltage.
        current: f64,
        /// Crossing direction.
        direction: Direction,
    },
    /// `|ΔZ|` exceeded the impedance threshold.
    ImpedanceJump {
        /// Signed impedance change.
        delta: f64,
        /// Previous accepted impedance magnitude.
        previous: f64,
        /// Current impedance magnitude.
        current: f64,
        /// Crossing direction.
        direction: Direction,
    },
    /// Impedance fell outside the deviation band around the running mean.
    OutOfBand {
        /// Observed impedance magnitude.
        actual: f64,
        /// The violated bound.
        expected: f64,
        /// Running mean after folding the current sample in.
        mean: f64,
        /// Which bound was violated.
        direction: Direction,
    },
}

/// Stateful analytics engine for one session.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    voltage_threshold: f64,
    impedance_threshold: f64,
    deviation_percent: f64,
    acc: Accumulator,
}

impl AnalyticsEngine {
    /// Engine with the given thresholds and a zeroed accumulator.
    pub fn new(voltage_threshold: f64, impedance_threshold: f64, deviation_percent: f64) -> Self {
        Self {
            voltage_threshold,
            impedance_threshold,
            deviation_percent,
            acc: Accumulator::default(),
        }
    }

    /// Engine configured from a validated session descriptor.
    pub fn from_descriptor(meta: &SessionDescriptor) -> Self {
        Self::new(
            meta.voltage_threshold,
            meta.impedance_threshold,
            meta.deviation_percent,
        )
    }

    /// Current accumulator state.
    pub fn accumulator(&self) -> &Accumulator {
        &self.acc
    }

    /// Number of accepted samples folded in so far.
    pub fn accepted(&self) -> u64 {
        self.acc.accepted
    }

    /// Fold one accepted sample into the running statistics.
    ///
    /// Must be called exactly once per accepted sample, in arrival order.
    /// Returns the detections raised by this sample, in emission order.
    pub fn process(&mut self, sample: &Sample) -> Detections {
        let mut out = Detections::new();

        // 1. Voltage delta against the previous accepted voltage. The
        //    baseline advances regardless of whether the threshold fired.
        let voltage = sample.voltage;
        if let Some(previous) = self.acc.last_voltage {
            let delta = voltage - previous;
            if delta.abs() > self.voltage_threshold {
                let _ = out.push(Detection::VoltageSpike {
                    delta,
                    previous,
                    current: voltage,
                    direction: Direction::of_delta(delta),
                });
            }
        }
        self.acc.last_voltage = Some(voltage);

        // 2. Impedance delta against the previous accepted impedance.
        let impedance = sample.impedance_magnitude();
        if let Some(previous) = self.acc.last_impedance {
            let delta = impedance - previous;
            if delta.abs() > self.impedance_threshold {
                let _ = out.push(Detection::ImpedanceJump {
                    delta,
                    previous,
                    current: impedance,
                    direction: Direction::of_delta(delta),
                });
            }
        }

        // 3. Fold the current impedance into the mean using the
        //    pre-increment count. The band below is checked against a mean
        //    that already includes this sample.
        let count = self.acc.accepted as f64;
        self.acc.running_mean_impedance =
            (self.acc.running_mean_impedance * count + impedance) / (count + 1.0);
        self.acc.accepted += 1;

        // 4. Symmetric percentage band around the updated mean. At most one
        //    excursion per sample.
        let mean = self.acc.running_mean_impedance;
        let low_bound = mean * (1.0 - self.deviation_percent / 100.0);
        let high_bound = mean * (1.0 + self.deviation_percent / 100.0);
        if impedance < low_bound {
            let _ = out.push(Detection::OutOfBand {
                actual: impedance,
                expected: low_bound,
                mean,
                direction: Direction::Below,
            });
        } else if impedance > high_bound {
            let _ = out.push(Detection::OutOfBand {
                actual: impedance,
                expected: high_bound,
                mean,
                direction: Direction::Above,
            });
        }

        // 5. The next sample's jump detection compares against this one.
        self.acc.last_impedance = Some(impedance);

        out
    }
}
