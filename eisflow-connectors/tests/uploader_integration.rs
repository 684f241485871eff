//! Integration tests for the bulk uploader
//!
//! Builds a small mixed-quality dataset on disk and sweeps it through a
//! real service with in-memory persistence.

use std::fs;
use std::path::Path;

use eisflow_connectors::{ConnectorError, UploadConfig, Uploader};
use eisflow_core::storage::memory::MemoryStorageProvider;
use eisflow_core::SessionService;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Hioki export: header, three good rows, one malformed row, one row that
/// parses but fails service-side validation (NaN resistance).
fn hioki_contents() -> &'static str {
    "FrequencyHz,R_ohm,X_ohm,V,T_degC,Range_ohm\n\
     1000,0.200,0.050,3.700,25,1\n\
     501.2,0.201,0.051,3.701,25,1\n\
     garbage line\n\
     251.5,0.202,0.052,3.702,25,1\n\
     100,NaN,0.050,3.700,25,1\n"
}

fn dataset() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    write(
        &root.path().join("Hk_IFR14500_SoC_50_03-07-2023_20-49.csv"),
        hioki_contents(),
    );
    write(
        &root.path().join("B02/EIS Measurement/Test_1/10%.csv"),
        "FrequencyHz,R_ohm,X_ohm,V,T_degC,Range_ohm\n\
         1000,0.300,0.060,3.650,25,1\n\
         500,0.301,0.061,3.651,25,1\n",
    );
    root
}

#[test]
fn sweep_uploads_every_discovered_file() {
    let root = dataset();
    let provider = MemoryStorageProvider::new();
    let storage = provider.handle();
    let service = SessionService::new(provider);

    let uploader = Uploader::new(&service, UploadConfig::default());
    let report = uploader.upload_all(root.path()).unwrap();

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files_ok(), 2);
    assert_eq!(report.files_failed(), 0);

    // Discovery order: Hioki file maps to B01/Test_1 and sorts first.
    let first = &report.files[0];
    assert_eq!(first.file.battery_id, "B01");
    assert_eq!(first.file.soc_percent, 50);
    assert_eq!(first.accepted, 3);
    assert_eq!(first.rejected_local, 1);
    assert_eq!(first.rejected_remote, 1);

    let second = &report.files[1];
    assert_eq!(second.file.battery_id, "B02");
    assert_eq!(second.file.test_id, "Test_1");
    assert_eq!(second.accepted, 2);

    assert_eq!(report.total_accepted(), 5);
    assert_eq!(report.total_rejected(), 2);

    // Both sessions persisted through the same sink and were finalized.
    assert_eq!(storage.samples().len(), 5);
    assert_eq!(storage.initialize_count(), 2);
    assert_eq!(storage.finalize_count(), 2);
    // The NaN sample was recorded as a reject by the service.
    assert_eq!(storage.rejects().len(), 1);
    assert!(storage.rejects()[0].0.starts_with("Invalid ResistanceOhm"));

    // The service is idle again: a new sweep can start.
    assert!(!service.is_active());
}

#[test]
fn reader_rejects_are_kept_when_a_rejects_dir_is_configured() {
    let root = dataset();
    let rejects = tempfile::tempdir().unwrap();
    let service = SessionService::new(MemoryStorageProvider::new());

    let config = UploadConfig {
        rejects_dir: Some(rejects.path().to_path_buf()),
        ..UploadConfig::default()
    };
    Uploader::new(&service, config).upload_all(root.path()).unwrap();

    let log = fs::read_to_string(rejects.path().join("B01_Test_1_50_rejects.csv")).unwrap();
    assert!(log.starts_with("RowIndex,Reason,RawLine"));
    assert!(log.contains("garbage line"));
}

#[test]
fn empty_dataset_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let service = SessionService::new(MemoryStorageProvider::new());

    let error = Uploader::new(&service, UploadConfig::default())
        .upload_all(root.path())
        .unwrap_err();
    assert!(matches!(error, ConnectorError::Dataset(_)));
}

#[test]
fn invalid_thresholds_fail_per_file_without_wedging_the_service() {
    let root = dataset();
    let service = SessionService::new(MemoryStorageProvider::new());

    let config = UploadConfig {
        voltage_threshold: 0.0,
        ..UploadConfig::default()
    };
    let report = Uploader::new(&service, config).upload_all(root.path()).unwrap();

    assert_eq!(report.files_failed(), 2);
    assert_eq!(report.total_accepted(), 0);
    assert!(!service.is_active());

    // A corrected sweep over the same service succeeds.
    let report = Uploader::new(&service, UploadConfig::default())
        .upload_all(root.path())
        .unwrap();
    assert_eq!(report.files_ok(), 2);
}
