//! Ledger-persisted audit records.

use serde::{Deserialize, Serialize};

use crate::id::audit_entry_id;

/// Final status of an attempted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// The action executed.
    Success,
    /// Every attempt errored.
    Failure,
    /// The engine's validation refused the action.
    Rejected,
    /// Attempts exhausted and the subject crossed its escalation limit.
    Escalated,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Failure => "failure",
            AuditStatus::Rejected => "rejected",
            AuditStatus::Escalated => "escalated",
        }
    }
}

/// Append-only record of one attempted action.
///
/// `details` is ciphertext produced by the audit logger; the id embeds
/// category, subject, and the millisecond timestamp, while `timestamp`
/// is truncated to whole seconds on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// `{category}-{subject}-{timestamp_ms}`
    pub id: String,
    /// Unix seconds.
    pub timestamp: i64,
    /// Which policy produced the record.
    pub category: String,
    /// Final status of the attempt.
    pub status: AuditStatus,
    /// Encrypted details.
    #[serde(with = "hex_bytes")]
    pub details: Vec<u8>,
}

impl AuditRecord {
    /// Build a record stamped at `timestamp_ms`.
    pub fn new(
        category: &str,
        subject: &str,
        status: AuditStatus,
        details: Vec<u8>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            id: audit_entry_id(category, subject, timestamp_ms),
            timestamp: timestamp_ms / 1000,
            category: category.to_string(),
            status,
            details,
        }
    }
}

/// Hex-encode the encrypted payload in human-readable serialization formats.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded).map_err(serde::de::Error::custom)
    }
}
