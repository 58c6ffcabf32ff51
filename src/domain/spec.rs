//! Immutable configuration for one control loop instance.

use std::time::Duration;

use crate::error::{Result, WardenError};

/// Configuration for one policy instance.
///
/// Created when the registry is populated and immutable afterwards. The
/// evaluate/act behavior itself lives in a `Policy` implementation; the spec
/// carries everything that varies per instance without new code.
#[derive(Debug, Clone)]
pub struct LoopSpec {
    /// Unique loop id, used for manual triggers and log correlation.
    pub id: String,

    /// Audit category written to every ledger record this loop produces.
    pub category: String,

    /// Interval between scheduled firings. Must be > 0.
    pub poll_interval: Duration,

    /// Re-attempts after the first failed execution (total attempts = max_retries + 1).
    pub max_retries: u32,

    /// Delay between attempts. None means immediate re-attempt.
    pub retry_backoff: Option<Duration>,

    /// Consecutive exhausted-failure count at which the outcome escalates.
    pub escalation_limit: Option<u32>,
}

impl LoopSpec {
    /// Create a spec with no retries and no escalation.
    pub fn new(id: impl Into<String>, category: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            poll_interval,
            max_retries: 0,
            retry_backoff: None,
            escalation_limit: None,
        }
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set a fixed delay between attempts.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = Some(backoff);
        self
    }

    /// Escalate once a subject fails this many exhausted cycles in a row.
    pub fn with_escalation_limit(mut self, limit: u32) -> Self {
        self.escalation_limit = Some(limit);
        self
    }

    /// Reject specs the registry must not run.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(WardenError::InvalidSpec("loop id must not be empty".to_string()));
        }
        if self.category.is_empty() {
            return Err(WardenError::InvalidSpec(format!("loop {}: category must not be empty", self.id)));
        }
        if self.poll_interval.is_zero() {
            return Err(WardenError::InvalidSpec(format!("loop {}: poll interval must be > 0", self.id)));
        }
        if self.escalation_limit == Some(0) {
            return Err(WardenError::InvalidSpec(format!("loop {}: escalation limit must be > 0", self.id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let spec = LoopSpec::new("shard-scaling", "shard-scaling", Duration::from_secs(60));
        assert_eq!(spec.id, "shard-scaling");
        assert_eq!(spec.max_retries, 0);
        assert!(spec.retry_backoff.is_none());
        assert!(spec.escalation_limit.is_none());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let spec = LoopSpec::new("reboot", "reboot-supervision", Duration::from_secs(30))
            .with_max_retries(2)
            .with_retry_backoff(Duration::from_millis(50))
            .with_escalation_limit(3);
        assert_eq!(spec.max_retries, 2);
        assert_eq!(spec.retry_backoff, Some(Duration::from_millis(50)));
        assert_eq!(spec.escalation_limit, Some(3));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let spec = LoopSpec::new("", "cat", Duration::from_secs(1));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let spec = LoopSpec::new("x", "cat", Duration::ZERO);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_escalation_limit() {
        let spec = LoopSpec::new("x", "cat", Duration::from_secs(1)).with_escalation_limit(0);
        assert!(spec.validate().is_err());
    }
}
