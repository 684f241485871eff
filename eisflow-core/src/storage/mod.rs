//! Persistence contract for session artifacts
//!
//! The session state machine owns exactly one storage sink for the
//! lifetime of the active session and releases it on `end_session` or
//! disposal. Sinks append three record streams per session: accepted
//! samples, rejected samples, and analytics alerts.
//!
//! Layout convention for file-backed sinks:
//! `<root>/<battery_id>/<test_id>/<soc>%/` with one timestamped CSV per
//! record stream.

use thiserror_no_std::Error;

use crate::sample::{Sample, SessionDescriptor};

#[cfg(feature = "storage-file")]
pub mod file;
#[cfg(feature = "storage-memory")]
pub mod memory;

/// Storage failure; wrapped into a
/// [`DataFormatFault`](crate::errors::DataFormatFault) at the operation
/// boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record write was attempted before `initialize`.
    #[error("storage not initialized")]
    NotInitialized,
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Session-scoped persistence sink.
pub trait SessionStorage: Send {
    /// Prepare the sink for a new session.
    fn initialize(&mut self, meta: &SessionDescriptor) -> StorageResult<()>;

    /// Append one accepted sample record.
    fn store_sample(&mut self, sample: &Sample) -> StorageResult<()>;

    /// Append one rejected record. A no-op before `initialize`.
    fn store_rejected(&mut self, reason: &str, raw: &str) -> StorageResult<()>;

    /// Append one analytics record. A no-op before `initialize`.
    fn store_alert(
        &mut self,
        alert_type: &str,
        message: &str,
        value: f64,
        bound: f64,
    ) -> StorageResult<()>;

    /// Flush all pending writes.
    fn finalize(&mut self) -> StorageResult<()>;

    /// Release all resources. Idempotent; repeated calls are no-ops.
    fn close(&mut self);
}

/// Opens a session-scoped sink keyed by `(battery_id, test_id, soc_percent)`.
pub trait StorageProvider: Send {
    /// Sink type produced by this provider.
    type Storage: SessionStorage;

    /// Open (but do not initialize) a sink for the described session.
    fn open(&self, meta: &SessionDescriptor) -> StorageResult<Self::Storage>;
}
