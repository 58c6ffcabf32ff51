//! TTL membership set.
//!
//! Keys mapped to expiry timestamps, used for temporary blacklists and
//! whitelists. Entries lapse in two steps: `contains` stops reporting a key
//! the moment its expiry passes, and `sweep` physically removes lapsed
//! entries and reports them so the owning policy can undo side effects
//! (unblock an IP, for example). Sweeping at least once per owning loop's
//! poll interval is a correctness requirement; nothing else bounds the map.

use std::collections::HashMap;
use std::time::Duration;

/// Keyed set whose entries automatically expire.
///
/// Time is supplied by the caller on every operation, which keeps the set
/// free of clock dependencies and makes expiry scenarios testable.
#[derive(Debug, Default)]
pub struct TtlSet {
    entries: HashMap<String, i64>,
}

impl TtlSet {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Insert `key` with the given ttl, or extend it if already present.
    ///
    /// Returns true when the key was newly inserted, false when an existing
    /// entry had its expiry extended. Callers that pair membership with an
    /// external side effect (block/unblock) use the return value to keep the
    /// side effect idempotent.
    pub fn insert(&mut self, key: impl Into<String>, ttl: Duration, now_ms: i64) -> bool {
        let expires_at = now_ms + ttl.as_millis() as i64;
        self.entries.insert(key.into(), expires_at).is_none()
    }

    /// True while `now_ms` is strictly before the key's expiry.
    ///
    /// A lapsed entry is reported absent even before the next sweep removes it.
    pub fn contains(&self, key: &str, now_ms: i64) -> bool {
        match self.entries.get(key) {
            Some(&expires_at) => expires_at > now_ms,
            None => false,
        }
    }

    /// Remove every entry with `expires_at <= now_ms`, returning the removed keys.
    pub fn sweep(&mut self, now_ms: i64) -> Vec<String> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|&(_, &expires_at)| expires_at <= now_ms)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Keys that have lapsed but not yet been swept. Read-only; evaluators
    /// use this to decide whether an acting cycle is needed.
    pub fn expired(&self, now_ms: i64) -> Vec<String> {
        self.entries
            .iter()
            .filter(|&(_, &expires_at)| expires_at <= now_ms)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Explicit early removal. Returns true when the key was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of entries, lapsed ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE_MS: i64 = 60 * 1000;

    #[test]
    fn test_present_for_full_window_then_absent() {
        let mut set = TtlSet::new();
        let t0 = 1_000_000;
        let ttl = Duration::from_secs(30 * 60);

        assert!(set.insert("1.2.3.4", ttl, t0));

        assert!(set.contains("1.2.3.4", t0));
        assert!(set.contains("1.2.3.4", t0 + 29 * MINUTE_MS));
        assert!(set.contains("1.2.3.4", t0 + 30 * MINUTE_MS - 1));
        // Never active at or after expiry, even before a sweep runs.
        assert!(!set.contains("1.2.3.4", t0 + 30 * MINUTE_MS));
        assert!(!set.contains("1.2.3.4", t0 + 31 * MINUTE_MS));
    }

    #[test]
    fn test_reinsert_extends_instead_of_duplicating() {
        let mut set = TtlSet::new();
        let ttl = Duration::from_secs(60);

        assert!(set.insert("addr", ttl, 0));
        assert!(!set.insert("addr", ttl, 30_000));
        assert_eq!(set.len(), 1);

        // Extended entry survives the original expiry.
        assert!(set.contains("addr", 70_000));
        assert!(!set.contains("addr", 90_000));
    }

    #[test]
    fn test_sweep_removes_and_reports_expired_only() {
        let mut set = TtlSet::new();
        set.insert("old", Duration::from_secs(10), 0);
        set.insert("fresh", Duration::from_secs(100), 0);

        let removed = set.sweep(10_000);
        assert_eq!(removed, vec!["old".to_string()]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("fresh", 10_000));

        // Sweeping again removes nothing.
        assert!(set.sweep(10_000).is_empty());
    }

    #[test]
    fn test_sweep_boundary_is_inclusive() {
        let mut set = TtlSet::new();
        set.insert("k", Duration::from_millis(500), 0);
        assert!(set.sweep(499).is_empty());
        assert_eq!(set.sweep(500), vec!["k".to_string()]);
    }

    #[test]
    fn test_expired_peek_leaves_entries_in_place() {
        let mut set = TtlSet::new();
        set.insert("k", Duration::from_millis(100), 0);

        assert!(set.expired(50).is_empty());
        assert_eq!(set.expired(100), vec!["k".to_string()]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_explicit_remove() {
        let mut set = TtlSet::new();
        set.insert("k", Duration::from_secs(60), 0);
        assert!(set.remove("k"));
        assert!(!set.remove("k"));
        assert!(set.is_empty());
    }
}
