//! Single control loop: evaluate, act with retries, audit the outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::audit::AuditLogger;
use crate::domain::{ActionRequest, LoopSpec, Outcome, TriggerDecision};
use crate::error::Result;
use crate::id::{Clock, SystemClock};
use crate::retry::{FailureTracker, RetryController};
use crate::runner::policy::{EvalContext, Policy};

/// Mutable per-loop state, guarded by the cycle lock.
struct CycleState {
    failures: FailureTracker,
}

/// Introspection snapshot for one loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopStatus {
    pub id: String,
    pub category: String,
    pub cycles_completed: u64,
    pub last_outcome: Option<String>,
}

/// One policy bound to its schedule, retry controller, and audit logger.
///
/// Every cycle runs under the loop's own lock, so at most one cycle is in
/// flight per loop at any time. Scheduled ticks skip when the lock is held;
/// manual triggers wait for it. Distinct loops share nothing and never
/// block each other.
pub struct ControlLoop {
    spec: LoopSpec,
    policy: Arc<dyn Policy>,
    retry: RetryController,
    audit: Arc<AuditLogger>,
    clock: Arc<dyn Clock>,
    state: Mutex<CycleState>,
    cycles_completed: AtomicU64,
    last_outcome: std::sync::Mutex<Option<&'static str>>,
}

impl ControlLoop {
    /// Create a loop for `spec` driving `policy`, with retry settings taken
    /// from the spec and the system clock.
    pub fn new(spec: LoopSpec, policy: Arc<dyn Policy>, audit: Arc<AuditLogger>) -> Self {
        let retry = RetryController::from_spec(&spec);
        Self {
            spec,
            policy,
            retry,
            audit,
            clock: Arc::new(SystemClock),
            state: Mutex::new(CycleState {
                failures: FailureTracker::new(),
            }),
            cycles_completed: AtomicU64::new(0),
            last_outcome: std::sync::Mutex::new(None),
        }
    }

    /// Replace the clock. Tests substitute a manual clock here.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &LoopSpec {
        &self.spec
    }

    /// Snapshot of this loop's progress for operators.
    pub fn status(&self) -> LoopStatus {
        let last = self.last_outcome.lock().unwrap().map(str::to_string);
        LoopStatus {
            id: self.spec.id.clone(),
            category: self.spec.category.clone(),
            cycles_completed: self.cycles_completed.load(Ordering::SeqCst),
            last_outcome: last,
        }
    }

    /// Consecutive failure count for `subject`, as seen by escalation.
    pub async fn consecutive_failures(&self, subject: &str) -> u32 {
        self.state.lock().await.failures.consecutive(subject)
    }

    /// Drop failure history for a subject that left the system.
    pub async fn forget_subject(&self, subject: &str) -> bool {
        self.state.lock().await.failures.forget(subject)
    }

    /// Scheduled entry point. Returns `None` without running anything when
    /// a cycle is already in flight, so timer ticks never queue up behind a
    /// slow action.
    pub async fn run_scheduled(&self) -> Option<Result<Outcome>> {
        match self.state.try_lock() {
            Ok(mut state) => Some(self.cycle(&mut state, None).await),
            Err(_) => {
                debug!(loop_id = %self.spec.id, "cycle in flight, skipping tick");
                None
            }
        }
    }

    /// Manual entry point. Waits for any in-flight cycle to finish, then
    /// runs the same cycle as the scheduler, with `hint` passed through to
    /// the policy.
    pub async fn trigger(&self, hint: Option<Value>) -> Result<Outcome> {
        let mut state = self.state.lock().await;
        self.cycle(&mut state, hint).await
    }

    async fn cycle(&self, state: &mut CycleState, hint: Option<Value>) -> Result<Outcome> {
        let now_ms = self.clock.now_ms();
        let ctx = EvalContext {
            now_ms,
            hint: hint.as_ref(),
            failures: &state.failures,
        };

        let decision = match self.policy.evaluate(ctx).await {
            Ok(decision) => decision,
            Err(err) => {
                warn!(loop_id = %self.spec.id, error = %err, "evaluation failed, skipping cycle");
                let outcome = Outcome::Skipped {
                    reason: err.to_string(),
                };
                self.finish(&outcome);
                return Ok(outcome);
            }
        };

        let request = match decision {
            TriggerDecision::NoAction => {
                debug!(loop_id = %self.spec.id, "no action required");
                let outcome = Outcome::Idle;
                self.finish(&outcome);
                return Ok(outcome);
            }
            TriggerDecision::Act(request) => request,
        };

        info!(
            loop_id = %self.spec.id,
            subject = %request.subject,
            "threshold breached, executing action"
        );

        let policy = Arc::clone(&self.policy);
        let outcome = self
            .retry
            .execute(&self.spec.id, &request, &mut state.failures, |_| {
                let policy = Arc::clone(&policy);
                let request = request.clone();
                async move { policy.act(&request).await }
            })
            .await;

        if let Some(status) = outcome.audit_status() {
            let details = audit_details(&request, &outcome);
            if let Err(err) = self
                .audit
                .record(
                    &self.spec.category,
                    &request.subject,
                    status,
                    &details,
                    self.clock.now_ms(),
                )
                .await
            {
                error!(
                    loop_id = %self.spec.id,
                    subject = %request.subject,
                    error = %err,
                    "audit write failed"
                );
                self.finish(&outcome);
                return Err(err);
            }
        }

        info!(loop_id = %self.spec.id, outcome = outcome.label(), "cycle complete");
        self.finish(&outcome);
        Ok(outcome)
    }

    fn finish(&self, outcome: &Outcome) {
        self.cycles_completed.fetch_add(1, Ordering::SeqCst);
        *self.last_outcome.lock().unwrap() = Some(outcome.label());
    }
}

/// Build the audit detail payload for an attempted action.
fn audit_details(request: &ActionRequest, outcome: &Outcome) -> Value {
    let mut details = json!({
        "payload": request.payload,
        "outcome": outcome.label(),
    });
    match outcome {
        Outcome::Success { attempts, details: result } => {
            details["attempts"] = (*attempts).into();
            details["result"] = result.clone();
        }
        Outcome::Rejected { reason } => {
            details["reason"] = reason.clone().into();
        }
        Outcome::Failed { attempts, error } => {
            details["attempts"] = (*attempts).into();
            details["error"] = error.clone().into();
        }
        Outcome::Escalated {
            attempts,
            error,
            consecutive_failures,
        } => {
            details["attempts"] = (*attempts).into();
            details["error"] = error.clone().into();
            details["consecutive-failures"] = (*consecutive_failures).into();
        }
        Outcome::Idle | Outcome::Skipped { .. } => {}
    }
    details
}
