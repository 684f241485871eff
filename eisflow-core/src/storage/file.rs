//! File-backed session storage
//!
//! Appends three CSV files per session under
//! `<root>/<battery_id>/<test_id>/<soc>%/`, each named with a wall-clock
//! stamp so repeated sessions for the same key never overwrite each other:
//!
//! - `session_<stamp>.csv` — accepted samples, one row per measurement
//!   plus the derived impedance magnitude
//! - `rejects_<stamp>.csv` — rejected samples with the failure reason
//! - `analytics_<stamp>.csv` — threshold-crossing alerts
//!
//! Writers flush after every record; a stuck disk therefore stalls the
//! pushing operation, which matches the service's blocking contract.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::sample::{Sample, SessionDescriptor};
use crate::storage::{SessionStorage, StorageError, StorageProvider, StorageResult};
use crate::time::Timestamp;

const SESSION_HEADER: &str =
    "FrequencyHz,ResistanceOhm,ReactanceOhm,Voltage,TemperatureC,RangeOhm,RowIndex,Timestamp,Impedance";
const REJECTS_HEADER: &str = "Reason,RawData";
const ANALYTICS_HEADER: &str = "Timestamp,AlertType,Message,Value,Bound";

/// Provider rooted at a storage directory.
#[derive(Debug, Clone)]
pub struct FileStorageProvider {
    root: PathBuf,
}

impl FileStorageProvider {
    /// Provider writing under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory a session with this key persists into.
    pub fn session_dir(&self, meta: &SessionDescriptor) -> PathBuf {
        self.root
            .join(&meta.battery_id)
            .join(&meta.test_id)
            .join(format!("{}%", meta.soc_percent))
    }
}

impl StorageProvider for FileStorageProvider {
    type Storage = FileStorage;

    fn open(&self, meta: &SessionDescriptor) -> StorageResult<FileStorage> {
        let dir = self.session_dir(meta);
        fs::create_dir_all(&dir)?;
        Ok(FileStorage::new(dir))
    }
}

struct Writers {
    session: BufWriter<File>,
    rejects: BufWriter<File>,
    analytics: BufWriter<File>,
}

/// File-backed sink for one session.
pub struct FileStorage {
    dir: PathBuf,
    writers: Option<Writers>,
    stored: u64,
}

impl FileStorage {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            writers: None,
            stored: 0,
        }
    }

    /// Directory this sink writes into.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Accepted samples stored so far.
    pub fn stored(&self) -> u64 {
        self.stored
    }

    fn create(&self, name: &str, header: &str) -> StorageResult<BufWriter<File>> {
        let mut writer = BufWriter::new(File::create(self.dir.join(name))?);
        writeln!(writer, "{header}")?;
        writer.flush()?;
        Ok(writer)
    }
}

/// Commas in free text would break the record shape.
fn escape(text: &str) -> String {
    text.replace(',', ";")
}

/// Render a millisecond timestamp as RFC 3339.
fn rfc3339(timestamp: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl SessionStorage for FileStorage {
    fn initialize(&mut self, _meta: &SessionDescriptor) -> StorageResult<()> {
        let stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        self.writers = Some(Writers {
            session: self.create(&format!("session_{stamp}.csv"), SESSION_HEADER)?,
            rejects: self.create(&format!("rejects_{stamp}.csv"), REJECTS_HEADER)?,
            analytics: self.create(&format!("analytics_{stamp}.csv"), ANALYTICS_HEADER)?,
        });
        self.stored = 0;
        log::debug!("session storage initialized in {}", self.dir.display());
        Ok(())
    }

    fn store_sample(&mut self, sample: &Sample) -> StorageResult<()> {
        let writers = self.writers.as_mut().ok_or(StorageError::NotInitialized)?;
        writeln!(
            writers.session,
            "{},{},{},{},{},{},{},{},{}",
            sample.frequency_hz,
            sample.resistance_ohm,
            sample.reactance_ohm,
            sample.voltage,
            sample.temperature_c,
            sample.range_ohm,
            sample.row_index,
            rfc3339(sample.timestamp),
            sample.impedance_magnitude(),
        )?;
        writers.session.flush()?;
        self.stored += 1;
        Ok(())
    }

    fn store_rejected(&mut self, reason: &str, raw: &str) -> StorageResult<()> {
        let Some(writers) = self.writers.as_mut() else {
            return Ok(());
        };
        writeln!(writers.rejects, "{},{}", escape(reason), escape(raw))?;
        writers.rejects.flush()?;
        Ok(())
    }

    fn store_alert(
        &mut self,
        alert_type: &str,
        message: &str,
        value: f64,
        bound: f64,
    ) -> StorageResult<()> {
        let Some(writers) = self.writers.as_mut() else {
            return Ok(());
        };
        writeln!(
            writers.analytics,
            "{},{},{},{},{}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            alert_type,
            escape(message),
            value,
            bound,
        )?;
        writers.analytics.flush()?;
        Ok(())
    }

    fn finalize(&mut self) -> StorageResult<()> {
        if let Some(writers) = self.writers.as_mut() {
            writers.session.flush()?;
            writers.rejects.flush()?;
            writers.analytics.flush()?;
            log::debug!(
                "session finalized - {} samples stored in {}",
                self.stored,
                self.dir.display()
            );
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut writers) = self.writers.take() {
            // Flush what we can; close must not fail.
            for writer in [
                &mut writers.session,
                &mut writers.rejects,
                &mut writers.analytics,
            ] {
                if let Err(error) = writer.flush() {
                    log::warn!("flush on close failed: {error}");
                }
            }
        }
    }
}

impl Drop for FileStorage {
    fn drop(&mut self) {
        self.close();
    }
}
