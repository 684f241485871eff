//! Session descriptor checks
//!
//! Applied once, before a session can become active. A descriptor that
//! fails here leaves the service state unchanged.

use crate::errors::ValidationFault;
use crate::sample::SessionDescriptor;

/// Validate a session descriptor, first failure wins.
pub fn validate_descriptor(meta: &SessionDescriptor) -> Result<(), ValidationFault> {
    if meta.battery_id.trim().is_empty() {
        return Err(ValidationFault::new(
            "BatteryId is required",
            "BatteryId",
            &meta.battery_id,
        ));
    }

    if meta.test_id.trim().is_empty() {
        return Err(ValidationFault::new(
            "TestId is required",
            "TestId",
            &meta.test_id,
        ));
    }

    if !(0..=100).contains(&meta.soc_percent) {
        return Err(ValidationFault::new(
            "SoC% must be between 0 and 100",
            "SocPercent",
            meta.soc_percent,
        ));
    }

    if !(meta.voltage_threshold > 0.0) {
        return Err(ValidationFault::new(
            "VoltageThreshold must be positive",
            "VoltageThreshold",
            meta.voltage_threshold,
        ));
    }

    if !(meta.impedance_threshold > 0.0) {
        return Err(ValidationFault::new(
            "ImpedanceThreshold must be positive",
            "ImpedanceThreshold",
            meta.impedance_threshold,
        ));
    }

    if !(meta.deviation_percent > 0.0) || meta.deviation_percent > 100.0 {
        return Err(ValidationFault::new(
            "DeviationPercent must be between 0 and 100",
            "DeviationPercent",
            meta.deviation_percent,
        ));
    }

    Ok(())
}
