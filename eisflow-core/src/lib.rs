//! Core session and streaming-analytics engine for EisFlow
//!
//! Ingests battery EIS (electrochemical impedance spectroscopy)
//! measurements one sample at a time, validates each sample before it can
//! touch any running statistic, and raises threshold-crossing alerts with
//! exact, reproducible arithmetic.
//!
//! Key guarantees:
//! - One active session at a time, guarded by a single lock
//! - Samples update the accumulator in strict arrival order
//! - Rejected samples never enter the running mean
//!
//! ```no_run
//! use eisflow_core::{SessionService, EisService, SessionDescriptor};
//! use eisflow_core::storage::file::FileStorageProvider;
//!
//! let service = SessionService::new(FileStorageProvider::new("BatteryStorage"));
//!
//! let meta = SessionDescriptor {
//!     battery_id: "B01".into(),
//!     test_id: "Test_1".into(),
//!     soc_percent: 50,
//!     file_name: "50%.csv".into(),
//!     total_rows: 29,
//!     started_at: 1_700_000_000_000,
//!     voltage_threshold: 0.1,
//!     impedance_threshold: 0.5,
//!     deviation_percent: 25.0,
//! };
//!
//! service.start_session(meta)?;
//! // push samples, then:
//! service.end_session()?;
//! # Ok::<(), eisflow_core::Fault>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod analytics;
pub mod errors;
pub mod events;
pub mod sample;
pub mod time;
pub mod validators;

#[cfg(feature = "std")]
pub mod session;
#[cfg(feature = "std")]
pub mod storage;
#[cfg(feature = "ingest-file")]
pub mod ingest;

// Public API
pub use errors::{DataFormatFault, Fault, ServiceResult, ValidationFault};
pub use sample::{Ack, AckStatus, Sample, SessionDescriptor};
#[cfg(feature = "std")]
pub use session::{EisService, SessionService};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
