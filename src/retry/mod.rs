//! Bounded retries and failure-count escalation.
//!
//! An action is attempted up to `max_retries + 1` times, stopping at the
//! first success or the first validation rejection. Exhaustion increments
//! the subject's consecutive-failure count once; crossing the policy's
//! escalation limit turns the outcome into an escalation for external
//! alerting. Success at any attempt resets the subject's count to zero.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use crate::domain::{ActionRequest, ActionResult, LoopSpec, Outcome};
use crate::error::Result;

/// Default bound on tracked subjects per loop.
const DEFAULT_CAPACITY: usize = 1024;

/// Per-subject consecutive-failure counts for one loop.
///
/// Bounded: when a new subject would exceed capacity, the least recently
/// touched subject is evicted. `forget` removes a subject explicitly when
/// its entity is decommissioned.
#[derive(Debug)]
pub struct FailureTracker {
    counts: HashMap<String, SubjectFailures>,
    capacity: usize,
    tick: u64,
}

#[derive(Debug, Clone, Copy)]
struct SubjectFailures {
    consecutive: u32,
    touched: u64,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counts: HashMap::new(),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    /// Current consecutive-failure count; an untracked subject reads as zero.
    pub fn consecutive(&self, subject: &str) -> u32 {
        self.counts.get(subject).map(|s| s.consecutive).unwrap_or(0)
    }

    /// Count one exhausted retry sequence against the subject.
    ///
    /// Returns the new consecutive count.
    pub fn record_failure(&mut self, subject: &str) -> u32 {
        self.tick += 1;
        if !self.counts.contains_key(subject) && self.counts.len() >= self.capacity {
            self.evict_stalest();
        }
        let entry = self.counts.entry(subject.to_string()).or_insert(SubjectFailures {
            consecutive: 0,
            touched: 0,
        });
        entry.consecutive += 1;
        entry.touched = self.tick;
        entry.consecutive
    }

    /// Reset the subject to zero after an observed success.
    ///
    /// The entry is dropped entirely; an absent subject reads as zero.
    pub fn record_success(&mut self, subject: &str) {
        self.counts.remove(subject);
    }

    /// Lifecycle hook: stop tracking a decommissioned subject.
    pub fn forget(&mut self, subject: &str) -> bool {
        self.counts.remove(subject).is_some()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn evict_stalest(&mut self) {
        let stalest = self
            .counts
            .iter()
            .min_by_key(|(_, s)| s.touched)
            .map(|(subject, _)| subject.clone());
        if let Some(subject) = stalest {
            tracing::debug!(subject = %subject, "failure tracker at capacity, evicting stalest subject");
            self.counts.remove(&subject);
        }
    }
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps one policy action with the retry/escalation contract.
#[derive(Debug, Clone)]
pub struct RetryController {
    max_retries: u32,
    backoff: Option<Duration>,
    escalation_limit: Option<u32>,
}

impl RetryController {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: None,
            escalation_limit: None,
        }
    }

    pub fn from_spec(spec: &LoopSpec) -> Self {
        Self {
            max_retries: spec.max_retries,
            backoff: spec.retry_backoff,
            escalation_limit: spec.escalation_limit,
        }
    }

    /// Fixed delay between attempts; the attempt ceiling is unchanged.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Escalate when a subject's consecutive exhausted failures reach `limit`.
    pub fn with_escalation_limit(mut self, limit: u32) -> Self {
        self.escalation_limit = Some(limit);
        self
    }

    /// Invoke `attempt_fn` until it succeeds, is rejected, or the budget of
    /// `max_retries + 1` attempts is spent.
    ///
    /// The failure counter is touched exactly once per call: reset on
    /// success, incremented on exhaustion, untouched on rejection.
    pub async fn execute<F, Fut>(
        &self,
        loop_id: &str,
        request: &ActionRequest,
        failures: &mut FailureTracker,
        mut attempt_fn: F,
    ) -> Outcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<ActionResult>>,
    {
        let total_attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=total_attempts {
            match attempt_fn(attempt).await {
                Ok(ActionResult::Executed(details)) => {
                    failures.record_success(&request.subject);
                    if attempt > 1 {
                        tracing::info!(
                            loop_id = %loop_id,
                            subject = %request.subject,
                            attempt,
                            "action succeeded after retries"
                        );
                    }
                    return Outcome::Success { attempts: attempt, details };
                }
                Ok(ActionResult::Rejected(reason)) => {
                    tracing::warn!(
                        loop_id = %loop_id,
                        subject = %request.subject,
                        reason = %reason,
                        "action rejected by validation"
                    );
                    return Outcome::Rejected { reason };
                }
                Err(err) => {
                    last_error = err.to_string();
                    tracing::warn!(
                        loop_id = %loop_id,
                        subject = %request.subject,
                        attempt,
                        total_attempts,
                        error = %last_error,
                        "action attempt failed"
                    );
                    if attempt < total_attempts {
                        if let Some(backoff) = self.backoff {
                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
            }
        }

        let consecutive = failures.record_failure(&request.subject);
        if let Some(limit) = self.escalation_limit {
            if consecutive >= limit {
                tracing::error!(
                    loop_id = %loop_id,
                    subject = %request.subject,
                    consecutive,
                    limit,
                    "retries exhausted, escalating"
                );
                return Outcome::Escalated {
                    attempts: total_attempts,
                    error: last_error,
                    consecutive_failures: consecutive,
                };
            }
        }

        Outcome::Failed {
            attempts: total_attempts,
            error: last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WardenError;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn request() -> ActionRequest {
        ActionRequest::new("node-1", json!({}))
    }

    #[tokio::test]
    async fn test_always_failing_action_attempted_exactly_budget_times() {
        let controller = RetryController::new(2);
        let mut failures = FailureTracker::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);

        let outcome = controller
            .execute("test-loop", &request(), &mut failures, move |_| {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<ActionResult, _>(WardenError::Engine("down".to_string()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            outcome,
            Outcome::Failed { attempts: 3, error: "Engine error: down".to_string() }
        );
        assert_eq!(failures.consecutive("node-1"), 1);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let controller = RetryController::new(5);
        let mut failures = FailureTracker::new();

        let outcome = controller
            .execute("test-loop", &request(), &mut failures, |_| async {
                Ok(ActionResult::Executed(json!({ "done": true })))
            })
            .await;

        match outcome {
            Outcome::Success { attempts, details } => {
                assert_eq!(attempts, 1);
                assert_eq!(details["done"], true);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_resets_counter_regardless_of_prior_value() {
        let controller = RetryController::new(0);
        let mut failures = FailureTracker::new();
        failures.record_failure("node-1");
        failures.record_failure("node-1");
        failures.record_failure("node-1");
        assert_eq!(failures.consecutive("node-1"), 3);

        let outcome = controller
            .execute("test-loop", &request(), &mut failures, |_| async {
                Ok(ActionResult::Executed(json!(null)))
            })
            .await;

        assert!(outcome.is_success());
        assert_eq!(failures.consecutive("node-1"), 0);
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds_on_third() {
        let controller = RetryController::new(2);
        let mut failures = FailureTracker::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);

        let outcome = controller
            .execute("test-loop", &request(), &mut failures, move |_| {
                let calls = Arc::clone(&calls_in);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(WardenError::Engine("transient".to_string()))
                    } else {
                        Ok(ActionResult::Executed(json!({ "attempt": 3 })))
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match outcome {
            Outcome::Success { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(failures.consecutive("node-1"), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_terminal_and_leaves_counter_alone() {
        let controller = RetryController::new(4);
        let mut failures = FailureTracker::new();
        failures.record_failure("node-1");
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);

        let outcome = controller
            .execute("test-loop", &request(), &mut failures, move |_| {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ActionResult::Rejected("validation failed".to_string()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, Outcome::Rejected { reason: "validation failed".to_string() });
        assert_eq!(failures.consecutive("node-1"), 1);
    }

    #[tokio::test]
    async fn test_escalates_when_consecutive_failures_reach_limit() {
        let controller = RetryController::new(0).with_escalation_limit(3);
        let mut failures = FailureTracker::new();

        for expected in 1..=2u32 {
            let outcome = controller
                .execute("test-loop", &request(), &mut failures, |_| async {
                    Err::<ActionResult, _>(WardenError::Engine("still down".to_string()))
                })
                .await;
            assert_eq!(
                outcome,
                Outcome::Failed { attempts: 1, error: "Engine error: still down".to_string() }
            );
            assert_eq!(failures.consecutive("node-1"), expected);
        }

        let outcome = controller
            .execute("test-loop", &request(), &mut failures, |_| async {
                Err::<ActionResult, _>(WardenError::Engine("still down".to_string()))
            })
            .await;

        assert_eq!(
            outcome,
            Outcome::Escalated {
                attempts: 1,
                error: "Engine error: still down".to_string(),
                consecutive_failures: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_backoff_preserves_attempt_ceiling() {
        tokio::time::pause();
        let controller = RetryController::new(2).with_backoff(Duration::from_millis(100));
        let mut failures = FailureTracker::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);

        let outcome = controller
            .execute("test-loop", &request(), &mut failures, move |_| {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<ActionResult, _>(WardenError::Engine("down".to_string()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(outcome, Outcome::Failed { attempts: 3, .. }));
    }

    #[test]
    fn test_tracker_counts_per_subject() {
        let mut tracker = FailureTracker::new();
        assert_eq!(tracker.record_failure("a"), 1);
        assert_eq!(tracker.record_failure("a"), 2);
        assert_eq!(tracker.record_failure("b"), 1);
        assert_eq!(tracker.consecutive("a"), 2);
        assert_eq!(tracker.consecutive("missing"), 0);
    }

    #[test]
    fn test_tracker_forget() {
        let mut tracker = FailureTracker::new();
        tracker.record_failure("gone");
        assert!(tracker.forget("gone"));
        assert!(!tracker.forget("gone"));
        assert_eq!(tracker.consecutive("gone"), 0);
    }

    #[test]
    fn test_tracker_evicts_stalest_at_capacity() {
        let mut tracker = FailureTracker::with_capacity(2);
        tracker.record_failure("old");
        tracker.record_failure("mid");
        // "old" is stalest; inserting a third subject evicts it.
        tracker.record_failure("new");

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.consecutive("old"), 0);
        assert_eq!(tracker.consecutive("mid"), 1);
        assert_eq!(tracker.consecutive("new"), 1);
    }

    #[test]
    fn test_tracker_eviction_respects_recency() {
        let mut tracker = FailureTracker::with_capacity(2);
        tracker.record_failure("a");
        tracker.record_failure("b");
        // Touch "a" so "b" becomes stalest.
        tracker.record_failure("a");
        tracker.record_failure("c");

        assert_eq!(tracker.consecutive("a"), 2);
        assert_eq!(tracker.consecutive("b"), 0);
        assert_eq!(tracker.consecutive("c"), 1);
    }
}
