//! Validator-set policies: rotation by uptime, key rotation by age.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::{KeyRotationConfig, ValidatorRotationConfig};
use crate::domain::{ActionRequest, ActionResult, TriggerDecision};
use crate::engine::ConsensusEngine;
use crate::error::Result;
use crate::runner::{EvalContext, Policy};
use crate::thresholds::{MaxAge, Threshold};

/// Rotates low-uptime validators out of the active set, batch-capped.
///
/// At most `batch_size` validators are rotated per cycle; the rest wait for
/// the next tick. The whole batch is one engine call and one audit entry
/// under the fixed subject `validator-set`.
pub struct ValidatorRotationPolicy {
    consensus: Arc<dyn ConsensusEngine>,
    min_uptime: Threshold,
    batch_size: usize,
}

impl ValidatorRotationPolicy {
    pub fn new(consensus: Arc<dyn ConsensusEngine>, config: &ValidatorRotationConfig) -> Self {
        Self {
            consensus,
            min_uptime: Threshold::Floor(config.min_uptime),
            batch_size: config.batch_size,
        }
    }
}

#[async_trait]
impl Policy for ValidatorRotationPolicy {
    async fn evaluate(&self, _ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let validators = self.consensus.validator_uptimes().await?;
        let below: Vec<String> = validators
            .into_iter()
            .filter(|v| self.min_uptime.is_breached(v.uptime))
            .map(|v| v.id)
            .take(self.batch_size)
            .collect();

        if below.is_empty() {
            return Ok(TriggerDecision::NoAction);
        }
        Ok(TriggerDecision::act(
            "validator-set",
            json!({ "op": "rotate", "validators": below }),
        ))
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        let batch: Vec<String> = serde_json::from_value(request.payload["validators"].clone())?;
        self.consensus.rotate_validators(&batch).await?;
        Ok(ActionResult::Executed(json!({ "rotated": batch })))
    }
}

/// Rotates signing keys older than the configured age, one per cycle.
pub struct KeyRotationPolicy {
    consensus: Arc<dyn ConsensusEngine>,
    max_age: MaxAge,
}

impl KeyRotationPolicy {
    pub fn new(consensus: Arc<dyn ConsensusEngine>, config: &KeyRotationConfig) -> Self {
        Self {
            consensus,
            max_age: MaxAge::from_days(config.max_age_days),
        }
    }
}

#[async_trait]
impl Policy for KeyRotationPolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let keys = self.consensus.signing_keys().await?;
        for key in keys {
            if let Some(subject) = ctx.hint_subject() {
                if key.id != subject {
                    continue;
                }
            }
            if self.max_age.is_exceeded(key.created_at_ms, ctx.now_ms) {
                return Ok(TriggerDecision::act(
                    key.id,
                    json!({ "op": "rotate-key", "created-at-ms": key.created_at_ms }),
                ));
            }
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        let new_key = self.consensus.rotate_key(&request.subject).await?;
        Ok(ActionResult::Executed(json!({
            "old-key": request.subject,
            "new-key": new_key,
        })))
    }
}
