//! Cycle outcome types.

use serde_json::Value;

use crate::domain::record::AuditStatus;

/// Result of one evaluate→act→audit cycle.
///
/// Every cycle produces exactly one of these; failures are values here, never
/// process-terminating. Audit-path failures (ledger, encryption) are the
/// exception and surface as errors instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Evaluation decided no action is needed.
    Idle,
    /// The cycle did not run: another cycle was in flight, or evaluation failed.
    Skipped { reason: String },
    /// Action executed. `attempts` counts the successful attempt.
    Success { attempts: u32, details: Value },
    /// The engine rejected the action during validation; not retried.
    Rejected { reason: String },
    /// Every attempt failed; the subject stays below its escalation limit.
    Failed { attempts: u32, error: String },
    /// Every attempt failed and consecutive failures reached the limit.
    Escalated {
        attempts: u32,
        error: String,
        consecutive_failures: u32,
    },
}

impl Outcome {
    /// Short lowercase label for logs and status snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Idle => "idle",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Success { .. } => "success",
            Outcome::Rejected { .. } => "rejected",
            Outcome::Failed { .. } => "failed",
            Outcome::Escalated { .. } => "escalated",
        }
    }

    /// True when an action ran and succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// True when an action was attempted, whatever the result.
    ///
    /// Exactly these outcomes carry an audit record.
    pub fn attempted(&self) -> bool {
        self.audit_status().is_some()
    }

    /// Ledger status for this outcome, None when nothing was attempted.
    pub fn audit_status(&self) -> Option<AuditStatus> {
        match self {
            Outcome::Idle | Outcome::Skipped { .. } => None,
            Outcome::Success { .. } => Some(AuditStatus::Success),
            Outcome::Rejected { .. } => Some(AuditStatus::Rejected),
            Outcome::Failed { .. } => Some(AuditStatus::Failure),
            Outcome::Escalated { .. } => Some(AuditStatus::Escalated),
        }
    }
}
