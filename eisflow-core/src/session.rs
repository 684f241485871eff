//! Session state machine and service surface
//!
//! A long-lived singleton holding zero or one sessions. All three
//! operations execute under a single mutual-exclusion lock scoped to the
//! whole operation body, so no two operations interleave and every
//! accumulator update happens in strict arrival order. Calls block until
//! the operation completes; there is no cancellation at this layer.
//!
//! State transitions: `Idle -> Active -> Idle`. The storage handle is
//! owned by the `Active` state and released on `end_session` or disposal.
//!
//! Re-starting while a session is active is rejected; the running session
//! is left untouched and nothing is leaked. Callers must `end_session`
//! first.

use std::sync::{Mutex, MutexGuard};

use crate::analytics::AnalyticsEngine;
use crate::errors::{DataFormatFault, Fault, ServiceResult, ValidationFault};
use crate::events::{EventDispatcher, EventSink, SessionEvent, SessionKey};
use crate::sample::{Ack, Sample, SessionDescriptor};
use crate::storage::{SessionStorage, StorageProvider};
use crate::time::{SystemClock, TimeSource};
use crate::validators;

/// Remote operation surface of the ingestion service.
///
/// The transport hosting these operations is a collaborator concern; this
/// trait fixes their semantics.
pub trait EisService {
    /// Begin a session. Legal only when idle.
    fn start_session(&self, meta: SessionDescriptor) -> ServiceResult<Ack>;

    /// Push one measurement into the active session.
    fn push_sample(&self, sample: Sample) -> ServiceResult<Ack>;

    /// Finish the active session, flushing persistence.
    fn end_session(&self) -> ServiceResult<Ack>;
}

/// Everything owned exclusively while a session is active.
struct ActiveSession<S: SessionStorage> {
    descriptor: SessionDescriptor,
    analytics: AnalyticsEngine,
    storage: S,
}

struct Inner<S: SessionStorage> {
    session: Option<ActiveSession<S>>,
    dispatcher: EventDispatcher,
}

/// Process-wide session service; at most one session is active at a time.
pub struct SessionService<P: StorageProvider> {
    provider: P,
    clock: Box<dyn TimeSource>,
    inner: Mutex<Inner<P::Storage>>,
}

impl<P: StorageProvider> SessionService<P> {
    /// Service persisting through `provider`, stamped by the system clock.
    pub fn new(provider: P) -> Self {
        Self::with_clock(provider, Box::new(SystemClock))
    }

    /// Service with an explicit time source.
    pub fn with_clock(provider: P, clock: Box<dyn TimeSource>) -> Self {
        Self {
            provider,
            clock,
            inner: Mutex::new(Inner {
                session: None,
                dispatcher: EventDispatcher::new(),
            }),
        }
    }

    /// Register an observer for lifecycle and alert events.
    pub fn register_sink(&self, sink: Box<dyn EventSink + Send>) {
        self.lock().dispatcher.register(sink);
    }

    /// Whether a session is currently active.
    pub fn is_active(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Dispose any active session, releasing its storage handle without
    /// finalizing. Idempotent; never panics.
    pub fn close(&self) {
        if let Some(mut active) = self.lock().session.take() {
            log::warn!(
                "disposing active session {} without finalize",
                SessionKey::of(&active.descriptor)
            );
            active.storage.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<P::Storage>> {
        // A poisoned lock means a prior operation panicked mid-mutation.
        // Partial mutations stay visible and the session counts as
        // unrecoverable, so continue with whatever state is there.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn internal(message: &str, source: impl std::fmt::Display) -> Fault {
    DataFormatFault::wrap(message, source).into()
}

impl<P: StorageProvider> EisService for SessionService<P> {
    fn start_session(&self, meta: SessionDescriptor) -> ServiceResult<Ack> {
        let mut inner = self.lock();

        if inner.session.is_some() {
            return Err(ValidationFault::new("session already active", "session", "active").into());
        }

        validators::validate_descriptor(&meta)?;

        let mut storage = self
            .provider
            .open(&meta)
            .map_err(|e| internal("failed to open session storage", e))?;
        storage
            .initialize(&meta)
            .map_err(|e| internal("failed to initialize session storage", e))?;

        let started = SessionEvent::SessionStarted {
            key: SessionKey::of(&meta),
            file_name: meta.file_name.clone(),
            expected_rows: meta.total_rows,
            timestamp: self.clock.now(),
        };

        let analytics = AnalyticsEngine::from_descriptor(&meta);
        inner.session = Some(ActiveSession {
            descriptor: meta,
            analytics,
            storage,
        });
        inner.dispatcher.dispatch(&started);

        Ok(Ack::in_progress("Session started"))
    }

    fn push_sample(&self, sample: Sample) -> ServiceResult<Ack> {
        let mut guard = self.lock();
        let Inner {
            session,
            dispatcher,
        } = &mut *guard;

        let Some(active) = session.as_mut() else {
            return Err(ValidationFault::new("session not started", "session", "null").into());
        };

        if let Err(fault) = validators::validate_sample(&sample) {
            // Record the reject first; the accumulator is never touched, so
            // a failing reject write cannot desynchronize state and is only
            // logged. The validation fault is what the caller must see.
            if let Err(error) = active.storage.store_rejected(&fault.message, &sample.raw_csv()) {
                log::warn!("failed to record rejected sample: {error}");
            }
            return Err(fault.into());
        }

        active
            .storage
            .store_sample(&sample)
            .map_err(|e| internal("failed to store sample", e))?;

        let detections = active.analytics.process(&sample);
        let key = SessionKey::of(&active.descriptor);
        let now = self.clock.now();

        for detection in detections {
            let event = SessionEvent::from_detection(
                key.clone(),
                detection,
                active.descriptor.voltage_threshold,
                active.descriptor.impedance_threshold,
                now,
            );
            // The accumulator already advanced: a failed alert write must
            // surface as an internal fault, not be swallowed.
            if let (Some(alert_type), Some(value), Some(bound)) =
                (event.alert_type(), event.value(), event.bound())
            {
                active
                    .storage
                    .store_alert(alert_type, &event.message(), value, bound)
                    .map_err(|e| internal("failed to store analytics record", e))?;
            }
            dispatcher.dispatch(&event);
        }

        Ok(Ack::in_progress("Sample accepted"))
    }

    fn end_session(&self) -> ServiceResult<Ack> {
        let mut guard = self.lock();
        let Inner {
            session,
            dispatcher,
        } = &mut *guard;

        let Some(mut active) = session.take() else {
            return Err(ValidationFault::new("no active session", "session", "null").into());
        };

        let finalized = active.storage.finalize();
        active.storage.close();
        finalized.map_err(|e| internal("failed to finalize session storage", e))?;

        let completed = SessionEvent::SessionCompleted {
            key: SessionKey::of(&active.descriptor),
            accepted: active.analytics.accepted(),
            timestamp: self.clock.now(),
        };
        dispatcher.dispatch(&completed);

        Ok(Ack::completed("Session completed"))
    }
}

impl<P: StorageProvider> Drop for SessionService<P> {
    fn drop(&mut self) {
        self.close();
    }
}
