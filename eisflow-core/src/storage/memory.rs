//! In-memory session storage
//!
//! Records everything in shared vectors so tests can inspect what the
//! session state machine persisted. Clones share state, which lets a test
//! keep a handle while the service owns the sink. Optional write-failure
//! injection exercises the internal-fault path.

use std::sync::{Arc, Mutex};

use crate::sample::{Sample, SessionDescriptor};
use crate::storage::{SessionStorage, StorageError, StorageProvider, StorageResult};

/// One recorded analytics alert.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    /// Alert type tag.
    pub alert_type: String,
    /// Rendered event message.
    pub message: String,
    /// Recorded value.
    pub value: f64,
    /// Threshold or violated bound.
    pub bound: f64,
}

#[derive(Debug, Default)]
struct Records {
    initialized: u32,
    samples: Vec<Sample>,
    rejects: Vec<(String, String)>,
    alerts: Vec<AlertRecord>,
    finalized: u32,
    closed: u32,
    fail_writes: bool,
}

/// Shared-handle in-memory sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<Records>>,
}

impl MemoryStorage {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.lock().fail_writes {
            return Err(StorageError::Io(std::io::Error::other(
                "injected write failure",
            )));
        }
        Ok(())
    }

    /// Accepted samples stored so far.
    pub fn samples(&self) -> Vec<Sample> {
        self.lock().samples.clone()
    }

    /// Rejected records `(reason, raw)` stored so far.
    pub fn rejects(&self) -> Vec<(String, String)> {
        self.lock().rejects.clone()
    }

    /// Analytics alerts stored so far.
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.lock().alerts.clone()
    }

    /// Number of `initialize` calls.
    pub fn initialize_count(&self) -> u32 {
        self.lock().initialized
    }

    /// Number of `finalize` calls.
    pub fn finalize_count(&self) -> u32 {
        self.lock().finalized
    }

    /// Number of `close` calls that actually released the sink.
    pub fn close_count(&self) -> u32 {
        self.lock().closed
    }
}

impl SessionStorage for MemoryStorage {
    fn initialize(&mut self, _meta: &SessionDescriptor) -> StorageResult<()> {
        self.check_writable()?;
        self.lock().initialized += 1;
        Ok(())
    }

    fn store_sample(&mut self, sample: &Sample) -> StorageResult<()> {
        self.check_writable()?;
        let mut records = self.lock();
        if records.initialized == 0 {
            return Err(StorageError::NotInitialized);
        }
        records.samples.push(*sample);
        Ok(())
    }

    fn store_rejected(&mut self, reason: &str, raw: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut records = self.lock();
        if records.initialized == 0 {
            return Ok(());
        }
        records.rejects.push((reason.into(), raw.into()));
        Ok(())
    }

    fn store_alert(
        &mut self,
        alert_type: &str,
        message: &str,
        value: f64,
        bound: f64,
    ) -> StorageResult<()> {
        self.check_writable()?;
        let mut records = self.lock();
        if records.initialized == 0 {
            return Ok(());
        }
        records.alerts.push(AlertRecord {
            alert_type: alert_type.into(),
            message: message.into(),
            value,
            bound,
        });
        Ok(())
    }

    fn finalize(&mut self) -> StorageResult<()> {
        self.check_writable()?;
        self.lock().finalized += 1;
        Ok(())
    }

    fn close(&mut self) {
        let mut records = self.lock();
        if records.initialized > 0 && records.closed == 0 {
            records.closed = 1;
        }
    }
}

/// Provider handing out clones of one shared sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageProvider {
    storage: MemoryStorage,
}

impl MemoryStorageProvider {
    /// Provider with a fresh sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto the shared sink for later inspection.
    pub fn handle(&self) -> MemoryStorage {
        self.storage.clone()
    }
}

impl StorageProvider for MemoryStorageProvider {
    type Storage = MemoryStorage;

    fn open(&self, _meta: &SessionDescriptor) -> StorageResult<MemoryStorage> {
        Ok(self.storage.clone())
    }
}
