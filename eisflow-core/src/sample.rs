//! Measurement and session value types
//!
//! Immutable value types for a session descriptor and a single EIS
//! measurement row, plus the acknowledgment returned by every operation.
//! The impedance magnitude is derived on demand and never stored as
//! authoritative state.

#[cfg(not(feature = "std"))]
use alloc::{
    format,
    string::{String, ToString},
};

use thiserror_no_std::Error;

use crate::time::Timestamp;

/// Minimum number of CSV columns in a measurement row.
pub const MIN_CSV_FIELDS: usize = 6;

/// Session descriptor, created once per session and immutable thereafter.
///
/// The analytic parameters (`voltage_threshold`, `impedance_threshold`,
/// `deviation_percent`) are fixed for the session's lifetime. `file_name`
/// and `total_rows` are informational and not validated against the data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionDescriptor {
    /// Battery under test, e.g. `B01`.
    pub battery_id: String,
    /// Test identifier, e.g. `Test_1`.
    pub test_id: String,
    /// State of charge, 0-100 percent.
    pub soc_percent: i32,
    /// Source file name, informational.
    pub file_name: String,
    /// Expected row count, informational.
    pub total_rows: u32,
    /// Session creation timestamp.
    pub started_at: Timestamp,
    /// Voltage delta threshold, must be positive.
    pub voltage_threshold: f64,
    /// Impedance delta threshold, must be positive.
    pub impedance_threshold: f64,
    /// Deviation band half-width as a percentage, in (0, 100].
    pub deviation_percent: f64,
}

/// One EIS measurement row, immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Excitation frequency, must be finite and strictly positive.
    pub frequency_hz: f64,
    /// Real component of impedance; finite, may be negative.
    pub resistance_ohm: f64,
    /// Imaginary component of impedance; finite, may be negative.
    pub reactance_ohm: f64,
    /// Terminal voltage, must be finite.
    pub voltage: f64,
    /// Cell temperature, informational.
    pub temperature_c: f64,
    /// Measurement range, informational.
    pub range_ohm: f64,
    /// Row index within the source file, must be non-negative.
    pub row_index: i64,
    /// Measurement timestamp; must not be the zero sentinel.
    pub timestamp: Timestamp,
}

impl Sample {
    /// Impedance magnitude `|Z| = sqrt(R² + X²)`, computed on demand.
    pub fn impedance_magnitude(&self) -> f64 {
        let sum_of_squares =
            self.resistance_ohm * self.resistance_ohm + self.reactance_ohm * self.reactance_ohm;
        #[cfg(feature = "std")]
        {
            sum_of_squares.sqrt()
        }
        #[cfg(not(feature = "std"))]
        {
            libm::sqrt(sum_of_squares)
        }
    }

    /// Parse one CSV data line: `freq,R,X,V,T,range[,...]`.
    ///
    /// Fields may be separated by commas, semicolons or tabs. `row_index`
    /// and `timestamp` come from the caller (the reader's line counter and
    /// clock); extra trailing columns are ignored.
    pub fn parse_csv(
        line: &str,
        row_index: i64,
        timestamp: Timestamp,
    ) -> Result<Self, CsvParseError> {
        let fields: heapless::Vec<&str, 8> = line
            .split([',', ';', '\t'])
            .map(str::trim)
            .take(8)
            .collect();

        if fields.len() < MIN_CSV_FIELDS {
            return Err(CsvParseError::FieldCount {
                found: fields.len(),
            });
        }

        let number = |column: &'static str, raw: &str| -> Result<f64, CsvParseError> {
            raw.parse::<f64>().map_err(|_| CsvParseError::Field {
                column,
                raw: raw.to_string(),
            })
        };

        Ok(Self {
            frequency_hz: number("FrequencyHz", fields[0])?,
            resistance_ohm: number("ResistanceOhm", fields[1])?,
            reactance_ohm: number("ReactanceOhm", fields[2])?,
            voltage: number("Voltage", fields[3])?,
            temperature_c: number("TemperatureC", fields[4])?,
            range_ohm: number("RangeOhm", fields[5])?,
            row_index,
            timestamp,
        })
    }

    /// Raw CSV representation used for reject records.
    pub fn raw_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.frequency_hz,
            self.resistance_ohm,
            self.reactance_ohm,
            self.voltage,
            self.temperature_c,
            self.range_ohm,
            self.row_index
        )
    }
}

/// Failure to parse a CSV measurement row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsvParseError {
    /// Too few columns for a measurement row.
    #[error("expected at least 6 fields, found {found}")]
    FieldCount {
        /// Number of columns present.
        found: usize,
    },
    /// A column failed to parse as a number.
    #[error("invalid {column}: '{raw}'")]
    Field {
        /// Name of the offending column.
        column: &'static str,
        /// Raw text of the offending column.
        raw: String,
    },
}

/// Operation status carried in every acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AckStatus {
    /// Session accepted the operation and remains open.
    #[cfg_attr(feature = "serde", serde(rename = "IN_PROGRESS"))]
    InProgress,
    /// Session finished and returned to idle.
    #[cfg_attr(feature = "serde", serde(rename = "COMPLETED"))]
    Completed,
}

impl AckStatus {
    /// Wire label for this status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AckStatus::InProgress => "IN_PROGRESS",
            AckStatus::Completed => "COMPLETED",
        }
    }
}

/// Acknowledgment returned by every successful operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ack {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Session status after the operation.
    pub status: AckStatus,
}

impl Ack {
    /// Successful acknowledgment for an operation leaving the session open.
    pub fn in_progress(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status: AckStatus::InProgress,
        }
    }

    /// Successful acknowledgment for a completed session.
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status: AckStatus::Completed,
        }
    }
}
