//! Transport-side collaborators for EisFlow
//!
//! The core service is transport-agnostic: it exposes three blocking
//! operations and a tagged fault enum. This crate supplies what sits at
//! that seam:
//!
//! - [`wire`] — the JSON projection of requests, acknowledgments and
//!   faults, so any host transport (HTTP handler, message queue consumer,
//!   line-delimited socket) agrees on one shape.
//! - [`uploader`] — the bulk-upload orchestrator that walks a measurement
//!   dataset and drives every discovered file through a service handle as
//!   one session per file.
//!
//! Neither module owns connection setup, framing or retries; those remain
//! the embedding application's concern.

pub mod uploader;
pub mod wire;

pub use uploader::{FileReport, UploadConfig, UploadReport, Uploader};

use thiserror::Error;

/// Errors surfaced by the connector layer.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The dataset root was missing or contained nothing usable.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// The service refused an operation with an internal fault.
    #[error("service fault: {0}")]
    Service(eisflow_core::Fault),

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading a measurement file failed.
    #[error("ingest error: {0}")]
    Ingest(eisflow_core::ingest::IngestError),

    /// Wire encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Core fault types do not guarantee a `std::error::Error` impl.
impl From<eisflow_core::Fault> for ConnectorError {
    fn from(fault: eisflow_core::Fault) -> Self {
        ConnectorError::Service(fault)
    }
}

impl From<eisflow_core::ingest::IngestError> for ConnectorError {
    fn from(error: eisflow_core::ingest::IngestError) -> Self {
        ConnectorError::Ingest(error)
    }
}
