//! Session lifecycle and analytic alert events
//!
//! Typed event payloads broadcast to interested observers on state
//! transitions and analytic detections. Delivery is synchronous, in-process
//! fan-out; a failing observer is logged and never aborts the operation
//! that raised the event.
//!
//! Every event carries the session identity (battery, test, SoC) and a
//! timestamp; [`SessionEvent::message`] renders the human-readable text
//! used by console observers and analytics records.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, format, string::String, vec::Vec};

use core::fmt;

use thiserror_no_std::Error;

use crate::analytics::Detection;
use crate::sample::SessionDescriptor;
use crate::time::Timestamp;

/// Direction of a threshold crossing relative to its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Value exceeded the baseline or band.
    Above,
    /// Value fell below the baseline or band.
    Below,
}

impl Direction {
    /// Direction of a signed delta.
    pub fn of_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Direction::Above
        } else {
            Direction::Below
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Above => f.write_str("above"),
            Direction::Below => f.write_str("below"),
        }
    }
}

/// Identity of the session an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    /// Battery under test.
    pub battery_id: String,
    /// Test identifier.
    pub test_id: String,
    /// State of charge, percent.
    pub soc_percent: i32,
}

impl SessionKey {
    /// Key of the session described by `meta`.
    pub fn of(meta: &SessionDescriptor) -> Self {
        Self {
            battery_id: meta.battery_id.clone(),
            test_id: meta.test_id.clone(),
            soc_percent: meta.soc_percent,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}%",
            self.battery_id, self.test_id, self.soc_percent
        )
    }
}

/// Events emitted by the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session became active.
    SessionStarted {
        /// Session identity.
        key: SessionKey,
        /// Source file name, informational.
        file_name: String,
        /// Expected row count, informational.
        expected_rows: u32,
        /// When the session started.
        timestamp: Timestamp,
    },
    /// A session finished and returned to idle.
    SessionCompleted {
        /// Session identity.
        key: SessionKey,
        /// Accepted samples over the whole session.
        accepted: u64,
        /// When the session completed.
        timestamp: Timestamp,
    },
    /// Voltage changed by more than the session threshold between two
    /// consecutive accepted samples.
    VoltageSpike {
        /// Session identity.
        key: SessionKey,
        /// Signed voltage change.
        delta: f64,
        /// Previous accepted voltage.
        previous: f64,
        /// Current voltage.
        current: f64,
        /// Crossing direction.
        direction: Direction,
        /// Session voltage threshold.
        threshold: f64,
        /// When the crossing was detected.
        timestamp: Timestamp,
    },
    /// Impedance magnitude changed by more than the session threshold
    /// between two consecutive accepted samples.
    ImpedanceJump {
        /// Session identity.
        key: SessionKey,
        /// Signed impedance change.
        delta: f64,
        /// Previous accepted impedance magnitude.
        previous: f64,
        /// Current impedance magnitude.
        current: f64,
        /// Crossing direction.
        direction: Direction,
        /// Session impedance threshold.
        threshold: f64,
        /// When the crossing was detected.
        timestamp: Timestamp,
    },
    /// Impedance magnitude fell outside the deviation band around the
    /// running mean.
    OutOfBand {
        /// Session identity.
        key: SessionKey,
        /// Monitored parameter name.
        parameter: &'static str,
        /// Observed value.
        actual: f64,
        /// The violated band bound.
        expected: f64,
        /// Running mean at detection time (includes the current sample).
        mean: f64,
        /// Which bound was violated.
        direction: Direction,
        /// When the excursion was detected.
        timestamp: Timestamp,
    },
}

impl SessionEvent {
    /// Build the alert event for a detection raised while folding a sample.
    pub(crate) fn from_detection(
        key: SessionKey,
        detection: Detection,
        voltage_threshold: f64,
        impedance_threshold: f64,
        timestamp: Timestamp,
    ) -> Self {
        match detection {
            Detection::VoltageSpike {
                delta,
                previous,
                current,
                direction,
            } => SessionEvent::VoltageSpike {
                key,
                delta,
                previous,
                current,
                direction,
                threshold: voltage_threshold,
                timestamp,
            },
            Detection::ImpedanceJump {
                delta,
                previous,
                current,
                direction,
            } => SessionEvent::ImpedanceJump {
                key,
                delta,
                previous,
                current,
                direction,
                threshold: impedance_threshold,
                timestamp,
            },
            Detection::OutOfBand {
                actual,
                expected,
                mean,
                direction,
            } => SessionEvent::OutOfBand {
                key,
                parameter: "Impedance",
                actual,
                expected,
                mean,
                direction,
                timestamp,
            },
        }
    }

    /// Session identity the event belongs to.
    pub fn key(&self) -> &SessionKey {
        match self {
            SessionEvent::SessionStarted { key, .. }
            | SessionEvent::SessionCompleted { key, .. }
            | SessionEvent::VoltageSpike { key, .. }
            | SessionEvent::ImpedanceJump { key, .. }
            | SessionEvent::OutOfBand { key, .. } => key,
        }
    }

    /// When the event occurred.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SessionEvent::SessionStarted { timestamp, .. }
            | SessionEvent::SessionCompleted { timestamp, .. }
            | SessionEvent::VoltageSpike { timestamp, .. }
            | SessionEvent::ImpedanceJump { timestamp, .. }
            | SessionEvent::OutOfBand { timestamp, .. } => *timestamp,
        }
    }

    /// Human-readable message for logs and analytics records.
    pub fn message(&self) -> String {
        match self {
            SessionEvent::SessionStarted {
                file_name,
                expected_rows,
                ..
            } => format!("Session started - file: {file_name}, expected rows: {expected_rows}"),
            SessionEvent::SessionCompleted { accepted, .. } => {
                format!("Session completed - {accepted} samples processed")
            }
            SessionEvent::VoltageSpike {
                delta, direction, ..
            } => format!("Voltage spike detected: dV={delta:.3}V ({direction} baseline)"),
            SessionEvent::ImpedanceJump {
                delta, direction, ..
            } => format!("Impedance jump detected: dZ={delta:.3}ohm ({direction} baseline)"),
            SessionEvent::OutOfBand {
                parameter,
                actual,
                mean,
                direction,
                ..
            } => format!(
                "{parameter} out of band: {actual:.3} {direction} expected range (mean: {mean:.3})"
            ),
        }
    }

    /// Alert type tag for analytics records; `None` for lifecycle events.
    pub fn alert_type(&self) -> Option<&'static str> {
        match self {
            SessionEvent::VoltageSpike { .. } => Some("VoltageSpike"),
            SessionEvent::ImpedanceJump { .. } => Some("ImpedanceJump"),
            SessionEvent::OutOfBand { .. } => Some("OutOfBandWarning"),
            _ => None,
        }
    }

    /// Recorded value for analytics records: absolute delta for crossings,
    /// observed value for band excursions.
    pub fn value(&self) -> Option<f64> {
        match self {
            SessionEvent::VoltageSpike { delta, .. }
            | SessionEvent::ImpedanceJump { delta, .. } => Some(delta.abs()),
            SessionEvent::OutOfBand { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// Threshold or violated bound for analytics records.
    pub fn bound(&self) -> Option<f64> {
        match self {
            SessionEvent::VoltageSpike { threshold, .. }
            | SessionEvent::ImpedanceJump { threshold, .. } => Some(*threshold),
            SessionEvent::OutOfBand { expected, .. } => Some(*expected),
            _ => None,
        }
    }
}

/// Error surfaced by an observer; isolated by the dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Result type for observer callbacks.
pub type SinkResult = Result<(), SinkError>;

/// Observer notified of every session event.
pub trait EventSink {
    /// Handle one event. Errors are logged by the dispatcher and do not
    /// abort the operation that raised the event.
    fn on_event(&mut self, event: &SessionEvent) -> SinkResult;

    /// Name used when a dispatch failure is logged.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Synchronous fan-out dispatcher over registered observers.
#[derive(Default)]
pub struct EventDispatcher {
    sinks: Vec<Box<dyn EventSink + Send>>,
}

impl EventDispatcher {
    /// Empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn register(&mut self, sink: Box<dyn EventSink + Send>) {
        self.sinks.push(sink);
    }

    /// Deliver `event` to every observer, isolating failures.
    pub fn dispatch(&mut self, event: &SessionEvent) {
        for sink in &mut self.sinks {
            if let Err(_error) = sink.on_event(event) {
                #[cfg(feature = "log")]
                log::warn!("event sink '{}' failed: {}", sink.name(), _error);
            }
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

/// Console observer: lifecycle events at `info`, alerts at `warn`.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[cfg(feature = "std")]
impl EventSink for LogSink {
    fn on_event(&mut self, event: &SessionEvent) -> SinkResult {
        match event {
            SessionEvent::SessionStarted { key, .. }
            | SessionEvent::SessionCompleted { key, .. } => {
                log::info!("[{key}] {}", event.message());
            }
            _ => {
                log::warn!("[{}] {}", event.key(), event.message());
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
