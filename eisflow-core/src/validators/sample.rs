//! Measurement sample checks
//!
//! Applied to every pushed sample before it can reach the analytics
//! engine. Informational fields (`temperature_c`, `range_ohm`) are not
//! independently validated, and row indices are expected but not enforced
//! to increase within a session.

#[cfg(not(feature = "std"))]
use alloc::format;

use crate::errors::ValidationFault;
use crate::sample::Sample;
use crate::time::UNSET_TIMESTAMP;

/// Validate a measurement sample, first failure wins.
pub fn validate_sample(sample: &Sample) -> Result<(), ValidationFault> {
    if sample.frequency_hz <= 0.0 || !sample.frequency_hz.is_finite() {
        return Err(ValidationFault::new(
            format!(
                "Invalid FrequencyHz: {} (must be positive)",
                sample.frequency_hz
            ),
            "FrequencyHz",
            sample.frequency_hz,
        ));
    }

    if !sample.resistance_ohm.is_finite() {
        return Err(ValidationFault::new(
            format!("Invalid ResistanceOhm: {}", sample.resistance_ohm),
            "ResistanceOhm",
            sample.resistance_ohm,
        ));
    }

    if !sample.reactance_ohm.is_finite() {
        return Err(ValidationFault::new(
            format!("Invalid ReactanceOhm: {}", sample.reactance_ohm),
            "ReactanceOhm",
            sample.reactance_ohm,
        ));
    }

    if !sample.voltage.is_finite() {
        return Err(ValidationFault::new(
            format!("Invalid Voltage: {}", sample.voltage),
            "Voltage",
            sample.voltage,
        ));
    }

    if sample.row_index < 0 {
        return Err(ValidationFault::new(
            format!(
                "Invalid RowIndex: {} (must be non-negative)",
                sample.row_index
            ),
            "RowIndex",
            sample.row_index,
        ));
    }

    if sample.timestamp == UNSET_TIMESTAMP {
        return Err(ValidationFault::new(
            "Invalid Timestamp",
            "Timestamp",
            sample.timestamp,
        ));
    }

    Ok(())
}
