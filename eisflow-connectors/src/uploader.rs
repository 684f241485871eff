//! Bulk upload of discovered measurement files
//!
//! Walks a dataset root, then drives every discovered file through a
//! service handle as one session: start with the file's identity, push
//! each sample the CSV reader accepts, end. A sample the service rejects
//! is counted and logged but does not abort the file; a file that fails
//! outright is reported and does not abort the sweep.

use std::path::{Path, PathBuf};

use eisflow_core::ingest::{count_data_rows, discover_measurement_files, MeasurementFile, SampleStream};
use eisflow_core::time::{SystemClock, TimeSource};
use eisflow_core::{EisService, Fault, SessionDescriptor};

use crate::ConnectorError;

/// Analytic thresholds applied to every uploaded session.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Voltage delta threshold.
    pub voltage_threshold: f64,
    /// Impedance delta threshold.
    pub impedance_threshold: f64,
    /// Deviation band half-width, percent.
    pub deviation_percent: f64,
    /// Where reader reject logs go. `None` writes them to the system temp
    /// directory and removes them after the file completes.
    pub rejects_dir: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            voltage_threshold: 0.1,
            impedance_threshold: 0.5,
            deviation_percent: 25.0,
            rejects_dir: None,
        }
    }
}

/// Outcome of one file upload.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// The discovered file this report covers.
    pub file: MeasurementFile,
    /// Samples the service accepted.
    pub accepted: usize,
    /// Lines the CSV reader diverted before they reached the service.
    pub rejected_local: usize,
    /// Samples pushed but refused by the service.
    pub rejected_remote: usize,
    /// Fatal error, if the file did not complete.
    pub error: Option<String>,
}

impl FileReport {
    /// Whether the file completed its session.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate outcome of a dataset sweep.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    /// Per-file outcomes, in upload order.
    pub files: Vec<FileReport>,
}

impl UploadReport {
    /// Files that completed their session.
    pub fn files_ok(&self) -> usize {
        self.files.iter().filter(|f| f.is_ok()).count()
    }

    /// Files that failed outright.
    pub fn files_failed(&self) -> usize {
        self.files.len() - self.files_ok()
    }

    /// Samples accepted across all files.
    pub fn total_accepted(&self) -> usize {
        self.files.iter().map(|f| f.accepted).sum()
    }

    /// Samples rejected across all files, locally or by the service.
    pub fn total_rejected(&self) -> usize {
        self.files
            .iter()
            .map(|f| f.rejected_local + f.rejected_remote)
            .sum()
    }
}

/// Drives measurement files through a service handle.
pub struct Uploader<'a, S: EisService> {
    service: &'a S,
    config: UploadConfig,
}

impl<'a, S: EisService> Uploader<'a, S> {
    /// Uploader over `service` with the given thresholds.
    pub fn new(service: &'a S, config: UploadConfig) -> Self {
        Self { service, config }
    }

    /// Upload every measurement file under `dataset_root`.
    ///
    /// Fails only when nothing was discovered; individual file failures
    /// land in the report.
    pub fn upload_all(&self, dataset_root: &Path) -> Result<UploadReport, ConnectorError> {
        let files = discover_measurement_files(dataset_root);
        if files.is_empty() {
            return Err(ConnectorError::Dataset(format!(
                "no measurement files under {}",
                dataset_root.display()
            )));
        }

        log::info!("uploading {} measurement files", files.len());
        let mut report = UploadReport::default();

        for file in files {
            match self.upload_file(&file) {
                Ok(file_report) => {
                    log::info!(
                        "{}/{} SoC {}%: {} accepted, {} rejected",
                        file_report.file.battery_id,
                        file_report.file.test_id,
                        file_report.file.soc_percent,
                        file_report.accepted,
                        file_report.rejected_local + file_report.rejected_remote,
                    );
                    report.files.push(file_report);
                }
                Err(error) => {
                    log::error!("upload of {} failed: {error}", file.file_name);
                    report.files.push(FileReport {
                        file,
                        accepted: 0,
                        rejected_local: 0,
                        rejected_remote: 0,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        log::info!(
            "upload completed: {} ok, {} failed, {} samples accepted",
            report.files_ok(),
            report.files_failed(),
            report.total_accepted(),
        );
        Ok(report)
    }

    /// Upload a single measurement file as one session.
    pub fn upload_file(&self, file: &MeasurementFile) -> Result<FileReport, ConnectorError> {
        let meta = SessionDescriptor {
            battery_id: file.battery_id.clone(),
            test_id: file.test_id.clone(),
            soc_percent: file.soc_percent,
            file_name: file.file_name.clone(),
            total_rows: count_data_rows(&file.path),
            started_at: SystemClock.now(),
            voltage_threshold: self.config.voltage_threshold,
            impedance_threshold: self.config.impedance_threshold,
            deviation_percent: self.config.deviation_percent,
        };

        self.service.start_session(meta)?;

        let (rejects_path, ephemeral) = self.rejects_path(file);
        let outcome = self.push_file(&file.path, &rejects_path);
        if ephemeral {
            let _ = std::fs::remove_file(&rejects_path);
        }

        match outcome {
            Ok((accepted, rejected_local, rejected_remote)) => {
                self.service.end_session()?;
                Ok(FileReport {
                    file: file.clone(),
                    accepted,
                    rejected_local,
                    rejected_remote,
                    error: None,
                })
            }
            Err(error) => {
                // Release the session so the next file can start; the
                // original error is what the caller needs to see.
                if let Err(end_error) = self.service.end_session() {
                    log::warn!("end after failed upload also failed: {end_error}");
                }
                Err(error)
            }
        }
    }

    fn push_file(
        &self,
        csv: &Path,
        rejects: &Path,
    ) -> Result<(usize, usize, usize), ConnectorError> {
        let mut stream = SampleStream::open(csv, rejects)?;
        let mut accepted = 0;
        let mut rejected_remote = 0;

        while let Some(sample) = stream.next_sample()? {
            match self.service.push_sample(sample) {
                Ok(_) => accepted += 1,
                Err(Fault::Validation(fault)) => {
                    rejected_remote += 1;
                    log::warn!("sample rejected: {fault}");
                }
                // Internal fault: the session is unrecoverable, stop
                // pushing into it.
                Err(fault) => return Err(fault.into()),
            }
        }

        Ok((accepted, stream.stats().rejected, rejected_remote))
    }

    fn rejects_path(&self, file: &MeasurementFile) -> (PathBuf, bool) {
        let name = format!(
            "{}_{}_{}_rejects.csv",
            file.battery_id, file.test_id, file.soc_percent
        );
        match &self.config.rejects_dir {
            Some(dir) => (dir.join(name), false),
            None => (std::env::temp_dir().join(name), true),
        }
    }
}
