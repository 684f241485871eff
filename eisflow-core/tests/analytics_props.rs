//! Property tests for the streaming analytics accumulator

use proptest::prelude::*;

use eisflow_core::analytics::{AnalyticsEngine, Detection};
use eisflow_core::Sample;

fn sample(index: usize, voltage: f64, resistance: f64, reactance: f64) -> Sample {
    Sample {
        frequency_hz: 1000.0,
        resistance_ohm: resistance,
        reactance_ohm: reactance,
        voltage,
        temperature_c: 25.0,
        range_ohm: 1.0,
        row_index: index as i64 + 1,
        timestamp: 1000 + index as u64,
    }
}

proptest! {
    /// The incremental mean equals the arithmetic mean of the impedance
    /// magnitudes in arrival order, and the count tracks every accepted
    /// sample.
    #[test]
    fn running_mean_matches_batch_mean(
        readings in prop::collection::vec(
            (3.0f64..4.2, -10.0f64..10.0, -10.0f64..10.0),
            1..200,
        )
    ) {
        let mut engine = AnalyticsEngine::new(f64::MAX, f64::MAX, 100.0);
        let mut magnitudes = Vec::new();

        for (index, (voltage, resistance, reactance)) in readings.iter().enumerate() {
            let s = sample(index, *voltage, *resistance, *reactance);
            magnitudes.push(s.impedance_magnitude());
            engine.process(&s);
        }

        let batch_mean: f64 = magnitudes.iter().sum::<f64>() / magnitudes.len() as f64;
        let running = engine.accumulator().running_mean_impedance;

        prop_assert_eq!(engine.accepted(), readings.len() as u64);
        prop_assert!(
            (running - batch_mean).abs() <= 1e-9 * batch_mean.abs().max(1.0),
            "running {} vs batch {}", running, batch_mean
        );
    }

    /// With unreachable thresholds nothing can spike or jump; only band
    /// excursions above twice the mean remain possible at 100% deviation.
    #[test]
    fn unreachable_thresholds_never_raise_delta_detections(
        readings in prop::collection::vec(
            (3.0f64..4.2, -10.0f64..10.0, -10.0f64..10.0),
            1..100,
        )
    ) {
        let mut engine = AnalyticsEngine::new(f64::MAX, f64::MAX, 100.0);

        for (index, (voltage, resistance, reactance)) in readings.iter().enumerate() {
            let detections = engine.process(&sample(index, *voltage, *resistance, *reactance));
            for detection in &detections {
                match detection {
                    Detection::VoltageSpike { .. } | Detection::ImpedanceJump { .. } => {
                        prop_assert!(false, "unexpected delta detection: {:?}", detection);
                    }
                    // |Z| is non-negative, so the lower bound of a 100%
                    // band (zero) can never be undercut.
                    Detection::OutOfBand { actual, mean, .. } => {
                        prop_assert!(actual > &(2.0 * mean - 1e-12));
                    }
                }
            }
        }
    }

    /// The baseline for delta detection is always the immediately
    /// preceding accepted sample, verified against a shadow replay.
    #[test]
    fn spike_detection_matches_pairwise_deltas(
        voltages in prop::collection::vec(3.0f64..4.2, 2..100)
    ) {
        let threshold = 0.08;
        let mut engine = AnalyticsEngine::new(threshold, f64::MAX, 100.0);

        let mut expected = 0usize;
        let mut observed = 0usize;
        let mut previous: Option<f64> = None;

        for (index, voltage) in voltages.iter().enumerate() {
            if let Some(prev) = previous {
                if (voltage - prev).abs() > threshold {
                    expected += 1;
                }
            }
            previous = Some(*voltage);

            let detections = engine.process(&sample(index, *voltage, 0.2, 0.05));
            observed += detections
                .iter()
                .filter(|d| matches!(d, Detection::VoltageSpike { .. }))
                .count();
        }

        prop_assert_eq!(observed, expected);
    }
}
