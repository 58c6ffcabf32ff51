//! Append-only audit ledger interface.
//!
//! The control plane only appends. Retention, compaction, and queries belong
//! to the ledger implementation; the in-memory one here exists for tests and
//! exposes a read-back accessor for assertions.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::domain::AuditRecord;
use crate::error::{Result, WardenError};

/// Append-only store of audit records.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Persist one record. An error means the record was not stored.
    async fn append(&self, record: AuditRecord) -> Result<()>;
}

/// Vec-backed ledger for tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<AuditRecord>>,
    fail_appends: AtomicU32,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` appends with a ledger error.
    pub fn fail_next(&self, times: u32) {
        self.fail_appends.store(times, Ordering::SeqCst);
    }

    /// Snapshot of everything appended so far, in order.
    pub fn entries(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        let remaining = self.fail_appends.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_appends.store(remaining - 1, Ordering::SeqCst);
            return Err(WardenError::Ledger("append failed (injected)".to_string()));
        }
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuditStatus;

    fn record(id_suffix: i64) -> AuditRecord {
        AuditRecord::new("test", "subject", AuditStatus::Success, vec![1, 2], id_suffix)
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let ledger = MemoryLedger::new();
        ledger.append(record(1)).await.unwrap();
        ledger.append(record(2)).await.unwrap();

        let entries = ledger.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].id.ends_with("-1"));
        assert!(entries[1].id.ends_with("-2"));
    }

    #[tokio::test]
    async fn test_injected_failures_do_not_store() {
        let ledger = MemoryLedger::new();
        ledger.fail_next(1);

        let err = ledger.append(record(1)).await.unwrap_err();
        assert!(matches!(err, WardenError::Ledger(_)));
        assert!(ledger.is_empty());

        ledger.append(record(2)).await.unwrap();
        assert_eq!(ledger.len(), 1);
    }
}
