//! Fault taxonomy for the session service
//!
//! Two fault families cross the operation boundary:
//!
//! - [`ValidationFault`] — caller-correctable: a malformed or out-of-range
//!   descriptor/sample field, or an operation invoked in the wrong state
//!   (`push_sample` before `start_session`, `end_session` with no active
//!   session). Always names the offending field and value. Never mutates
//!   analytics state.
//! - [`DataFormatFault`] — unexpected internal failure (persistence I/O,
//!   unhandled error). Signals the session may be inconsistent; callers
//!   should not assume further operations will succeed.
//!
//! Validation failures are raised immediately after being recorded to the
//! rejects sink (when a session is active); they never escape as internal
//! errors. Internal failures are wrapped at the operation boundary and
//! re-raised as [`DataFormatFault`].

#[cfg(not(feature = "std"))]
use alloc::string::{String, ToString};

use thiserror_no_std::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, Fault>;

/// Caller-correctable input error naming the violated field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{message} (field: {field}, value: {value})")]
pub struct ValidationFault {
    /// Human-readable description of the violation.
    pub message: String,
    /// Name of the field that failed validation.
    pub field: String,
    /// Offending value, rendered as text.
    pub value: String,
}

impl ValidationFault {
    /// Build a fault for `field` carrying the offending `value`.
    pub fn new(
        message: impl Into<String>,
        field: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            message: message.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Unexpected internal failure; `details` may carry a diagnostic trace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{message}")]
pub struct DataFormatFault {
    /// Human-readable description of the failure.
    pub message: String,
    /// Optional diagnostic detail (source error text).
    pub details: Option<String>,
}

impl DataFormatFault {
    /// Wrap an internal failure, keeping the source error as detail.
    pub fn wrap(message: impl Into<String>, source: impl ToString) -> Self {
        Self {
            message: message.into(),
            details: Some(source.to_string()),
        }
    }
}

/// Tagged fault variant crossing the operation boundary.
///
/// Transports translate this into their own error mechanism; in-process
/// callers match on the variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Input rejected; the caller can correct and retry.
    #[error("{0}")]
    Validation(#[from] ValidationFault),
    /// Internal failure; the session may be inconsistent.
    #[error("{0}")]
    DataFormat(#[from] DataFormatFault),
}

impl Fault {
    /// Name of the violated field for validation faults.
    pub fn field(&self) -> Option<&str> {
        match self {
            Fault::Validation(fault) => Some(&fault.field),
            Fault::DataFormat(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_fault_renders_field_and_value() {
        let fault = ValidationFault::new("BatteryId is required", "BatteryId", "");
        assert_eq!(
            fault.to_string(),
            "BatteryId is required (field: BatteryId, value: )"
        );
    }

    #[test]
    fn fault_exposes_field_for_validation_only() {
        let fault: Fault = ValidationFault::new("bad", "SocPercent", 101).into();
        assert_eq!(fault.field(), Some("SocPercent"));

        let fault: Fault = DataFormatFault::wrap("write failed", "disk full").into();
        assert_eq!(fault.field(), None);
    }

    #[test]
    fn wrap_keeps_source_detail() {
        let fault = DataFormatFault::wrap("storage error", "permission denied");
        assert_eq!(fault.details.as_deref(), Some("permission denied"));
    }
}
