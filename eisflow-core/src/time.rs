//! Time sources for the session service
//!
//! Timestamps are milliseconds since the Unix epoch; `0` is the unset
//! sentinel a sample must not carry.

/// Timestamp in milliseconds since epoch.
pub type Timestamp = u64;

/// The unset-timestamp sentinel.
pub const UNSET_TIMESTAMP: Timestamp = 0;

/// Source of time for the service.
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Shareable fixed time source for deterministic tests.
///
/// Clones observe the same instant; advancing one handle advances all.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct FixedClock(std::sync::Arc<std::sync::atomic::AtomicU64>);

#[cfg(feature = "std")]
impl FixedClock {
    /// Create a clock frozen at `timestamp`.
    pub fn new(timestamp: Timestamp) -> Self {
        Self(std::sync::Arc::new(std::sync::atomic::AtomicU64::new(
            timestamp,
        )))
    }

    /// Jump to an absolute timestamp.
    pub fn set(&self, timestamp: Timestamp) {
        self.0.store(timestamp, std::sync::atomic::Ordering::Relaxed);
    }

    /// Advance by `ms` milliseconds.
    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(feature = "std")]
impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.0.load(std::sync::atomic::Ordering::Relaxed)
    }
}
