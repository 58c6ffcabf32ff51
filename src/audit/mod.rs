//! Audit logging: serialize, checksum, encrypt, append.
//!
//! This is the single encrypt-then-persist implementation every policy goes
//! through, so all audit entries share one shape and one failure contract:
//! an encryption error aborts the write outright (no plaintext ever reaches
//! the ledger) and a ledger error is reported to the caller without a retry.

use std::sync::Arc;

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::crypto::EncryptionService;
use crate::domain::{AuditRecord, AuditStatus};
use crate::error::Result;
use crate::ledger::Ledger;

/// Writes tamper-evident, encrypted audit entries.
pub struct AuditLogger {
    cipher: Arc<dyn EncryptionService>,
    ledger: Arc<dyn Ledger>,
}

impl AuditLogger {
    pub fn new(cipher: Arc<dyn EncryptionService>, ledger: Arc<dyn Ledger>) -> Self {
        Self { cipher, ledger }
    }

    /// Persist one attempted action and return the record id.
    ///
    /// The encrypted envelope carries the subject, the millisecond timestamp,
    /// the plaintext details, and a SHA-256 checksum binding them to the
    /// record's category and status, so a decrypting reader can detect
    /// tampering with either half.
    pub async fn record(
        &self,
        category: &str,
        subject: &str,
        status: AuditStatus,
        details: &Value,
        timestamp_ms: i64,
    ) -> Result<String> {
        let details_json = serde_json::to_string(details)?;
        let checksum = checksum(category, subject, status, timestamp_ms, &details_json);
        let envelope = serde_json::to_vec(&json!({
            "subject": subject,
            "timestamp_ms": timestamp_ms,
            "details": details,
            "checksum": checksum,
        }))?;

        let encrypted = self.cipher.encrypt(&envelope)?;

        let record = AuditRecord::new(category, subject, status, encrypted, timestamp_ms);
        let id = record.id.clone();
        self.ledger.append(record).await?;

        tracing::debug!(
            category = %category,
            subject = %subject,
            status = status.as_str(),
            "audit entry persisted"
        );
        Ok(id)
    }
}

/// Recompute the checksum of a decrypted envelope against its record.
///
/// Returns false when the envelope is malformed or any covered field was
/// altered after the write.
pub fn verify_envelope(record: &AuditRecord, envelope_bytes: &[u8]) -> bool {
    let envelope: Value = match serde_json::from_slice(envelope_bytes) {
        Ok(value) => value,
        Err(_) => return false,
    };
    let (Some(subject), Some(timestamp_ms), Some(stored)) = (
        envelope["subject"].as_str(),
        envelope["timestamp_ms"].as_i64(),
        envelope["checksum"].as_str(),
    ) else {
        return false;
    };
    let details_json = match serde_json::to_string(&envelope["details"]) {
        Ok(json) => json,
        Err(_) => return false,
    };
    let expected = checksum(&record.category, subject, record.status, timestamp_ms, &details_json);
    expected == stored
}

fn checksum(
    category: &str,
    subject: &str,
    status: AuditStatus,
    timestamp_ms: i64,
    details_json: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(b"|");
    hasher.update(subject.as_bytes());
    hasher.update(b"|");
    hasher.update(status.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(timestamp_ms.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(details_json.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::StubCipher;
    use crate::error::WardenError;
    use crate::ledger::MemoryLedger;

    fn logger() -> (AuditLogger, Arc<StubCipher>, Arc<MemoryLedger>) {
        let cipher = Arc::new(StubCipher::new());
        let ledger = Arc::new(MemoryLedger::new());
        let logger = AuditLogger::new(cipher.clone(), ledger.clone());
        (logger, cipher, ledger)
    }

    #[tokio::test]
    async fn test_record_persists_encrypted_entry() {
        let (logger, cipher, ledger) = logger();
        let details = json!({ "old_key": "key-1", "new_key": "key-1-r1" });

        let id = logger
            .record("key-rotation", "key-1", AuditStatus::Success, &details, 1_700_000_000_123)
            .await
            .unwrap();

        assert_eq!(id, "key-rotation-key-1-1700000000123");
        let entries = ledger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].timestamp, 1_700_000_000);
        assert_eq!(entries[0].status, AuditStatus::Success);

        // The stored bytes are ciphertext; decrypting recovers the envelope.
        let decrypted = cipher.decrypt(&entries[0].details);
        let envelope: Value = serde_json::from_slice(&decrypted).unwrap();
        assert_eq!(envelope["subject"], "key-1");
        assert_eq!(envelope["details"]["new_key"], "key-1-r1");
        assert!(verify_envelope(&entries[0], &decrypted));
    }

    #[tokio::test]
    async fn test_tampered_details_fail_verification() {
        let (logger, cipher, ledger) = logger();
        logger
            .record("reboot", "node-1", AuditStatus::Failure, &json!({ "attempts": 3 }), 5_000)
            .await
            .unwrap();

        let record = &ledger.entries()[0];
        let mut envelope: Value = serde_json::from_slice(&cipher.decrypt(&record.details)).unwrap();
        envelope["details"]["attempts"] = json!(1);
        let forged = serde_json::to_vec(&envelope).unwrap();

        assert!(!verify_envelope(record, &forged));
    }

    #[tokio::test]
    async fn test_tampered_record_status_fails_verification() {
        let (logger, cipher, ledger) = logger();
        logger
            .record("reboot", "node-1", AuditStatus::Escalated, &json!({}), 5_000)
            .await
            .unwrap();

        let mut record = ledger.entries()[0].clone();
        let decrypted = cipher.decrypt(&record.details);
        record.status = AuditStatus::Success;

        assert!(!verify_envelope(&record, &decrypted));
    }

    #[tokio::test]
    async fn test_encryption_failure_aborts_write() {
        let (logger, cipher, ledger) = logger();
        cipher.fail_next(1);

        let err = logger
            .record("cat", "sub", AuditStatus::Success, &json!({}), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, WardenError::Encryption(_)));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_ledger_failure_surfaces() {
        let (logger, _cipher, ledger) = logger();
        ledger.fail_next(1);

        let err = logger
            .record("cat", "sub", AuditStatus::Failure, &json!({}), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, WardenError::Ledger(_)));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_envelope_fails_verification() {
        let record = AuditRecord::new("c", "s", AuditStatus::Success, vec![], 1);
        assert!(!verify_envelope(&record, b"not json"));
        assert!(!verify_envelope(&record, b"{}"));
    }
}
