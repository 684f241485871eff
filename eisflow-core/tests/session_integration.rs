//! Integration tests for the session service
//!
//! Drives the full path: descriptor validation, per-sample validation,
//! streaming analytics, event fan-out and persistence, using the in-memory
//! sink for state inspection and the file sink for layout checks.

use std::sync::{Arc, Mutex};

use eisflow_core::analytics::AnalyticsEngine;
use eisflow_core::events::{EventSink, SessionEvent, SinkResult};
use eisflow_core::ingest::SampleStream;
use eisflow_core::sample::AckStatus;
use eisflow_core::storage::file::FileStorageProvider;
use eisflow_core::storage::memory::MemoryStorageProvider;
use eisflow_core::time::FixedClock;
use eisflow_core::{EisService, Fault, Sample, SessionDescriptor, SessionService};

fn descriptor() -> SessionDescriptor {
    SessionDescriptor {
        battery_id: "B01".into(),
        test_id: "Test_1".into(),
        soc_percent: 50,
        file_name: "Hk_IFR14500_SoC_50.csv".into(),
        total_rows: 3,
        started_at: 5000,
        voltage_threshold: 0.1,
        impedance_threshold: 0.5,
        deviation_percent: 25.0,
    }
}

fn sample(row: i64, voltage: f64, resistance: f64, reactance: f64) -> Sample {
    Sample {
        frequency_hz: 1000.0,
        resistance_ohm: resistance,
        reactance_ohm: reactance,
        voltage,
        temperature_c: 25.0,
        range_ohm: 1.0,
        row_index: row,
        timestamp: 5000 + row as u64,
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<SessionEvent>>>);

impl RecordingSink {
    fn events(&self) -> Vec<SessionEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, event: &SessionEvent) -> SinkResult {
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[test]
fn reference_scenario_raises_spike_then_out_of_band() {
    let provider = MemoryStorageProvider::new();
    let storage = provider.handle();
    let service = SessionService::with_clock(provider, Box::new(FixedClock::new(9000)));
    let sink = RecordingSink::default();
    service.register_sink(Box::new(sink.clone()));

    service.start_session(descriptor()).unwrap();
    service.push_sample(sample(1, 3.70, 0.20, 0.05)).unwrap();
    service.push_sample(sample(2, 3.85, 0.20, 0.05)).unwrap();
    service.push_sample(sample(3, 3.83, 0.60, 0.05)).unwrap();
    let ack = service.end_session().unwrap();
    assert_eq!(ack.status, AckStatus::Completed);

    // Started, spike on sample 2, out-of-band on sample 3, completed.
    let events = sink.events();
    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], SessionEvent::SessionStarted { .. }));
    match &events[1] {
        SessionEvent::VoltageSpike { delta, .. } => assert!((delta - 0.15).abs() < 1e-12),
        other => panic!("expected voltage spike, got {other:?}"),
    }
    match &events[2] {
        SessionEvent::OutOfBand { actual, mean, .. } => {
            assert!((actual - 0.602_079_729).abs() < 1e-6);
            assert!((mean - 0.338_130_097).abs() < 1e-6);
        }
        other => panic!("expected out-of-band, got {other:?}"),
    }
    match &events[3] {
        SessionEvent::SessionCompleted { accepted, .. } => assert_eq!(*accepted, 3),
        other => panic!("expected completion, got {other:?}"),
    }

    // The same detections were persisted as analytics records.
    let alerts = storage.alerts();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].alert_type, "VoltageSpike");
    assert!((alerts[0].value - 0.15).abs() < 1e-12);
    assert_eq!(alerts[0].bound, 0.1);
    assert_eq!(alerts[1].alert_type, "OutOfBandWarning");
    assert!((alerts[1].value - 0.602_079_729).abs() < 1e-6);

    assert_eq!(storage.samples().len(), 3);
    assert_eq!(storage.finalize_count(), 1);
}

#[test]
fn rejected_samples_never_advance_baselines_or_the_mean() {
    let provider = MemoryStorageProvider::new();
    let storage = provider.handle();
    let service = SessionService::with_clock(provider, Box::new(FixedClock::new(9000)));

    service.start_session(descriptor()).unwrap();
    service.push_sample(sample(1, 3.70, 0.20, 0.05)).unwrap();

    // Wild voltage, but invalid frequency: rejected before analytics.
    let mut bad = sample(2, 9.90, 0.20, 0.05);
    bad.frequency_hz = -1.0;
    let fault = service.push_sample(bad).unwrap_err();
    assert_eq!(fault.field(), Some("FrequencyHz"));

    // Delta against the last *accepted* voltage (3.70) stays under the
    // threshold; a baseline wrongly advanced to 9.90 would spike here.
    service.push_sample(sample(3, 3.75, 0.20, 0.05)).unwrap();
    assert!(storage.alerts().is_empty());

    assert_eq!(storage.samples().len(), 2);
    assert_eq!(storage.rejects().len(), 1);
    let (reason, raw) = &storage.rejects()[0];
    assert!(reason.starts_with("Invalid FrequencyHz"));
    assert!(raw.contains("9.9"));

    // The mean was built from the two accepted samples only.
    let mut shadow = AnalyticsEngine::new(0.1, 0.5, 25.0);
    shadow.process(&sample(1, 3.70, 0.20, 0.05));
    shadow.process(&sample(3, 3.75, 0.20, 0.05));
    match service.end_session().unwrap().status {
        AckStatus::Completed => {}
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(shadow.accepted(), 2);
}

#[test]
fn push_after_end_is_rejected_without_side_effects() {
    let provider = MemoryStorageProvider::new();
    let storage = provider.handle();
    let service = SessionService::with_clock(provider, Box::new(FixedClock::new(9000)));

    service.start_session(descriptor()).unwrap();
    service.push_sample(sample(1, 3.70, 0.20, 0.05)).unwrap();
    service.end_session().unwrap();

    let fault = service.push_sample(sample(2, 3.71, 0.20, 0.05)).unwrap_err();
    match fault {
        Fault::Validation(fault) => assert_eq!(fault.message, "session not started"),
        other => panic!("expected validation fault, got {other:?}"),
    }
    assert_eq!(storage.samples().len(), 1);
}

#[test]
fn ingest_stream_feeds_the_service_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("50%.csv");
    std::fs::write(
        &csv,
        "FrequencyHz,R_ohm,X_ohm,V,T_degC,Range_ohm\n\
         1000,0.20,0.05,3.70,25,1\n\
         oops,not,numbers,at,all,here\n\
         500,0.20,0.05,3.85,25,1\n",
    )
    .unwrap();

    let provider = MemoryStorageProvider::new();
    let storage = provider.handle();
    let service = SessionService::with_clock(provider, Box::new(FixedClock::new(9000)));
    service.start_session(descriptor()).unwrap();

    let rejects = dir.path().join("rejects.csv");
    let mut stream = SampleStream::open(&csv, &rejects).unwrap();
    let mut pushed = 0;
    while let Some(sample) = stream.next_sample().unwrap() {
        service.push_sample(sample).unwrap();
        pushed += 1;
    }
    service.end_session().unwrap();

    assert_eq!(pushed, 2);
    assert_eq!(stream.stats().rejected, 1);
    assert_eq!(storage.samples().len(), 2);
    // The 3.70 -> 3.85 step crossed the voltage threshold.
    assert_eq!(storage.alerts().len(), 1);
    assert_eq!(storage.alerts()[0].alert_type, "VoltageSpike");

    let reject_log = std::fs::read_to_string(&rejects).unwrap();
    assert!(reject_log.contains("oops"));
}

#[test]
fn file_storage_layout_through_the_service() {
    let root = tempfile::tempdir().unwrap();
    let service = SessionService::with_clock(
        FileStorageProvider::new(root.path()),
        Box::new(FixedClock::new(9000)),
    );

    service.start_session(descriptor()).unwrap();
    service.push_sample(sample(1, 3.70, 0.20, 0.05)).unwrap();
    service.push_sample(sample(2, 3.85, 0.20, 0.05)).unwrap();
    service.end_session().unwrap();

    let session_dir = root.path().join("B01").join("Test_1").join("50%");
    assert!(session_dir.is_dir());

    let mut names: Vec<String> = std::fs::read_dir(&session_dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 3);
    assert!(names[0].starts_with("analytics_"));
    assert!(names[1].starts_with("rejects_"));
    assert!(names[2].starts_with("session_"));

    let session_file = std::fs::read_to_string(session_dir.join(&names[2])).unwrap();
    // Header plus two accepted rows.
    assert_eq!(session_file.lines().count(), 3);

    let analytics_file = std::fs::read_to_string(session_dir.join(&names[0])).unwrap();
    assert!(analytics_file.contains("VoltageSpike"));
}

#[test]
fn service_disposal_is_idempotent_with_a_live_session() {
    let provider = MemoryStorageProvider::new();
    let storage = provider.handle();
    let service = SessionService::with_clock(provider, Box::new(FixedClock::new(9000)));
    service.start_session(descriptor()).unwrap();

    service.close();
    service.close();
    drop(service);

    assert_eq!(storage.close_count(), 1);
    assert_eq!(storage.finalize_count(), 0);
}
