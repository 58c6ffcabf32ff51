//! Timestamp and identifier utilities for warden
//!
//! Audit entry ids are built from category + subject + timestamp, which keeps
//! them practically unique across loops without a global sequence.

use std::sync::atomic::{AtomicI64, Ordering};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Build an audit entry id
///
/// Format: `{category}-{subject}-{timestamp_ms}`
/// Example: `key-rotation-key-7f3a-1738300800123`
pub fn audit_entry_id(category: &str, subject: &str, timestamp_ms: i64) -> String {
    format!("{}-{}-{}", category, subject, timestamp_ms)
}

/// Time source for control loops and age-based policies.
///
/// Production code uses [`SystemClock`]; tests drive expiry scenarios with
/// [`ManualClock`] instead of sleeping.
pub trait Clock: Send + Sync {
    /// Milliseconds since Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_ms()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start_ms`.
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    /// Move the clock forward by `delta_ms`.
    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
