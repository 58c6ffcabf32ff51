//! The policy seam between the loop machinery and node operations.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ActionRequest, ActionResult, TriggerDecision};
use crate::error::Result;
use crate::retry::FailureTracker;

/// Read-only view handed to [`Policy::evaluate`] for one cycle.
#[derive(Debug)]
pub struct EvalContext<'a> {
    /// Milliseconds since the Unix epoch, from the loop's clock.
    pub now_ms: i64,
    /// Operator-supplied focus for manual triggers, `None` on scheduled ticks.
    pub hint: Option<&'a Value>,
    /// Failure counts accumulated by this loop's previous cycles.
    pub failures: &'a FailureTracker,
}

impl EvalContext<'_> {
    /// The hint as a subject id, when the operator passed a string.
    ///
    /// Policies that scan a list of entities narrow the scan to this subject
    /// on manual triggers; policies with a single fixed subject ignore it.
    pub fn hint_subject(&self) -> Option<&str> {
        self.hint.and_then(Value::as_str)
    }
}

/// A control policy: reads metrics, decides whether to act, and executes
/// exactly one corrective operation when asked.
///
/// `evaluate` must not mutate node state; all side effects live in `act`.
/// `act` performs a single attempt with no retry and no logging. Retries,
/// escalation, and the audit trail belong to the loop that drives the policy.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Fetch current metrics and compare them against thresholds.
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision>;

    /// Execute the decided action once.
    ///
    /// A precondition failure is reported as [`ActionResult::Rejected`], not
    /// as an error; errors are reserved for operations that may succeed on a
    /// later attempt.
    async fn act(&self, request: &ActionRequest) -> Result<ActionResult>;
}
