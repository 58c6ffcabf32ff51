//! Consensus-engine policies: version rollout, hotfixes, block production,
//! batch execution, and governance.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::{
    BatchExecutionConfig, FinalizationConfig, GovernanceConfig, HotfixConfig,
    VersionRolloutConfig,
};
use crate::domain::{ActionRequest, ActionResult, TriggerDecision};
use crate::engine::ConsensusEngine;
use crate::error::{Result, WardenError};
use crate::runner::{EvalContext, Policy};
use crate::thresholds::Threshold;

/// Rolls the engine forward when a new version is published.
///
/// The version is validated first; an incompatible version is a rejection,
/// not a failure, and is re-examined on the next cycle in case the engine's
/// compatibility answer changes.
pub struct VersionRolloutPolicy {
    consensus: Arc<dyn ConsensusEngine>,
}

impl VersionRolloutPolicy {
    pub fn new(consensus: Arc<dyn ConsensusEngine>, _config: &VersionRolloutConfig) -> Self {
        Self { consensus }
    }
}

#[async_trait]
impl Policy for VersionRolloutPolicy {
    async fn evaluate(&self, _ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let Some(available) = self.consensus.available_version().await? else {
            return Ok(TriggerDecision::NoAction);
        };
        let current = self.consensus.current_version().await?;
        if available == current {
            return Ok(TriggerDecision::NoAction);
        }
        Ok(TriggerDecision::act(
            available.clone(),
            json!({ "op": "rollout", "from": current, "to": available }),
        ))
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        let version = &request.subject;
        if !self.consensus.validate_version(version).await? {
            return Ok(ActionResult::Rejected(format!(
                "version {version} failed validation"
            )));
        }
        self.consensus.set_current_version(version).await?;
        Ok(ActionResult::Executed(json!({ "version": version })))
    }
}

/// Applies pending hotfixes, one per cycle, with bounded retries.
pub struct HotfixPolicy {
    consensus: Arc<dyn ConsensusEngine>,
}

impl HotfixPolicy {
    pub fn new(consensus: Arc<dyn ConsensusEngine>, _config: &HotfixConfig) -> Self {
        Self { consensus }
    }
}

#[async_trait]
impl Policy for HotfixPolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let pending = self.consensus.pending_hotfixes().await?;
        let next = match ctx.hint_subject() {
            Some(subject) => pending.into_iter().find(|id| id == subject),
            None => pending.into_iter().next(),
        };
        match next {
            Some(hotfix_id) => Ok(TriggerDecision::act(hotfix_id, json!({ "op": "hotfix" }))),
            None => Ok(TriggerDecision::NoAction),
        }
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        self.consensus.apply_hotfix(&request.subject).await?;
        Ok(ActionResult::Executed(json!({ "hotfix": request.subject })))
    }
}

/// Folds pending sub-blocks into a block once enough accumulate.
pub struct FinalizationPolicy {
    consensus: Arc<dyn ConsensusEngine>,
    pending_ceiling: Threshold,
}

impl FinalizationPolicy {
    pub fn new(consensus: Arc<dyn ConsensusEngine>, config: &FinalizationConfig) -> Self {
        Self {
            consensus,
            pending_ceiling: Threshold::Ceiling(config.pending_threshold as f64),
        }
    }
}

#[async_trait]
impl Policy for FinalizationPolicy {
    async fn evaluate(&self, _ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let pending = self.consensus.pending_subblocks().await?;
        if !self.pending_ceiling.is_breached(pending as f64) {
            return Ok(TriggerDecision::NoAction);
        }
        Ok(TriggerDecision::act(
            "block-production",
            json!({ "op": "finalize", "pending": pending }),
        ))
    }

    async fn act(&self, _request: &ActionRequest) -> Result<ActionResult> {
        let folded = self.consensus.finalize_subblocks().await?;
        Ok(ActionResult::Executed(json!({ "finalized": folded })))
    }
}

/// Validates and executes pending transaction batches, one per cycle.
pub struct BatchExecutionPolicy {
    consensus: Arc<dyn ConsensusEngine>,
}

impl BatchExecutionPolicy {
    pub fn new(consensus: Arc<dyn ConsensusEngine>, _config: &BatchExecutionConfig) -> Self {
        Self { consensus }
    }
}

#[async_trait]
impl Policy for BatchExecutionPolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let pending = self.consensus.pending_batches().await?;
        let next = match ctx.hint_subject() {
            Some(subject) => pending.into_iter().find(|id| id == subject),
            None => pending.into_iter().next(),
        };
        match next {
            Some(batch_id) => Ok(TriggerDecision::act(batch_id, json!({ "op": "batch" }))),
            None => Ok(TriggerDecision::NoAction),
        }
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        if !self.consensus.validate_batch(&request.subject).await? {
            return Ok(ActionResult::Rejected(format!(
                "batch {} failed validation",
                request.subject
            )));
        }
        self.consensus.execute_batch(&request.subject).await?;
        Ok(ActionResult::Executed(json!({ "batch": request.subject })))
    }
}

/// Approves proposals that reached the vote threshold and rejects ones whose
/// voting deadline passed. Approval wins when both hold at once.
pub struct GovernancePolicy {
    consensus: Arc<dyn ConsensusEngine>,
    approval: Threshold,
}

impl GovernancePolicy {
    pub fn new(consensus: Arc<dyn ConsensusEngine>, config: &GovernanceConfig) -> Self {
        Self {
            consensus,
            approval: Threshold::Ceiling(config.approval_threshold),
        }
    }
}

#[async_trait]
impl Policy for GovernancePolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let proposals = self.consensus.proposals().await?;
        for proposal in proposals {
            if let Some(subject) = ctx.hint_subject() {
                if proposal.id != subject {
                    continue;
                }
            }
            if self.approval.is_breached(proposal.approval_ratio) {
                return Ok(TriggerDecision::act(
                    proposal.id,
                    json!({ "op": "approve", "approval-ratio": proposal.approval_ratio }),
                ));
            }
            if proposal.expires_at_ms <= ctx.now_ms {
                return Ok(TriggerDecision::act(
                    proposal.id,
                    json!({ "op": "reject", "reason": "voting period expired" }),
                ));
            }
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        match request.payload["op"].as_str() {
            Some("approve") => {
                self.consensus.approve_proposal(&request.subject).await?;
                Ok(ActionResult::Executed(json!({ "op": "approve" })))
            }
            Some("reject") => {
                self.consensus.reject_proposal(&request.subject).await?;
                Ok(ActionResult::Executed(json!({ "op": "reject" })))
            }
            other => Err(WardenError::InvalidState(format!(
                "unknown governance op: {other:?}"
            ))),
        }
    }
}
