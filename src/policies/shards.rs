//! Shard topology policies: split/merge by load, cross-shard transfers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::{ShardScalingConfig, ShardTransferConfig};
use crate::domain::{ActionRequest, ActionResult, TriggerDecision};
use crate::engine::ShardManager;
use crate::error::{Result, WardenError};
use crate::runner::{EvalContext, Policy};
use crate::thresholds::{BandSignal, HysteresisBand};

/// Splits overloaded shards and merges underloaded ones.
///
/// The split/merge limits form a hysteresis band, so a shard that settles
/// between them after a split is left alone instead of oscillating. Loads
/// are ratios relative to shard capacity; merges additionally require the
/// topology to stay at or above `min_shard_count`.
pub struct ShardScalingPolicy {
    shards: Arc<dyn ShardManager>,
    band: HysteresisBand,
    min_shard_count: usize,
}

impl ShardScalingPolicy {
    pub fn new(shards: Arc<dyn ShardManager>, config: &ShardScalingConfig) -> Result<Self> {
        Ok(Self {
            shards,
            band: HysteresisBand::new(config.split_threshold, config.merge_threshold)?,
            min_shard_count: config.min_shard_count,
        })
    }
}

#[async_trait]
impl Policy for ShardScalingPolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let loads = self.shards.shard_loads().await?;
        let shard_count = loads.len();

        for shard in loads {
            if let Some(subject) = ctx.hint_subject() {
                if shard.id != subject {
                    continue;
                }
            }
            match self.band.classify(shard.load) {
                BandSignal::High => {
                    return Ok(TriggerDecision::act(
                        shard.id,
                        json!({ "op": "split", "load": shard.load }),
                    ));
                }
                BandSignal::Low if shard_count > self.min_shard_count => {
                    return Ok(TriggerDecision::act(
                        shard.id,
                        json!({ "op": "merge", "load": shard.load }),
                    ));
                }
                BandSignal::Low | BandSignal::Within => {}
            }
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        match request.payload["op"].as_str() {
            Some("split") => {
                self.shards.split_shard(&request.subject).await?;
                Ok(ActionResult::Executed(json!({ "op": "split" })))
            }
            Some("merge") => {
                self.shards.merge_shard(&request.subject).await?;
                Ok(ActionResult::Executed(json!({ "op": "merge" })))
            }
            other => Err(WardenError::InvalidState(format!(
                "unknown shard op: {other:?}"
            ))),
        }
    }
}

/// Validates and executes pending cross-shard transfers, one per cycle.
pub struct TransferPolicy {
    shards: Arc<dyn ShardManager>,
}

impl TransferPolicy {
    pub fn new(shards: Arc<dyn ShardManager>, _config: &ShardTransferConfig) -> Self {
        Self { shards }
    }
}

#[async_trait]
impl Policy for TransferPolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let pending = self.shards.pending_transfers().await?;
        let next = match ctx.hint_subject() {
            Some(subject) => pending.into_iter().find(|id| id == subject),
            None => pending.into_iter().next(),
        };
        match next {
            Some(transfer_id) => Ok(TriggerDecision::act(transfer_id, json!({ "op": "transfer" }))),
            None => Ok(TriggerDecision::NoAction),
        }
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        if !self.shards.validate_transfer(&request.subject).await? {
            return Ok(ActionResult::Rejected(format!(
                "transfer {} failed validation",
                request.subject
            )));
        }
        self.shards.execute_transfer(&request.subject).await?;
        Ok(ActionResult::Executed(json!({ "transfer": request.subject })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockNode, types::ShardLoad};
    use crate::retry::FailureTracker;

    fn loads(pairs: &[(&str, f64)]) -> Vec<ShardLoad> {
        pairs
            .iter()
            .map(|(id, load)| ShardLoad { id: id.to_string(), load: *load })
            .collect()
    }

    fn ctx(failures: &FailureTracker) -> EvalContext<'_> {
        EvalContext { now_ms: 0, hint: None, failures }
    }

    fn scaling_policy(node: &Arc<MockNode>) -> ShardScalingPolicy {
        ShardScalingPolicy::new(node.clone(), &ShardScalingConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_overloaded_shard_splits() {
        let node = Arc::new(MockNode::new());
        node.set_shard_loads(loads(&[("shard-1", 0.50), ("shard-2", 0.80)]));
        let policy = scaling_policy(&node);
        let failures = FailureTracker::new();

        let decision = policy.evaluate(ctx(&failures)).await.unwrap();
        let TriggerDecision::Act(request) = decision else {
            panic!("expected split");
        };
        assert_eq!(request.subject, "shard-2");
        assert_eq!(request.payload["op"], "split");

        let result = policy.act(&request).await.unwrap();
        assert!(matches!(result, ActionResult::Executed(_)));
        assert_eq!(node.calls_for("split_shard"), 1);
        assert!(node.calls().contains(&"split_shard:shard-2".to_string()));
    }

    #[tokio::test]
    async fn test_load_inside_band_does_nothing() {
        let node = Arc::new(MockNode::new());
        node.set_shard_loads(loads(&[("shard-1", 0.30), ("shard-2", 0.60)]));
        let policy = scaling_policy(&node);
        let failures = FailureTracker::new();

        let decision = policy.evaluate(ctx(&failures)).await.unwrap();
        assert_eq!(decision, TriggerDecision::NoAction);
    }

    #[tokio::test]
    async fn test_underloaded_shard_merges() {
        let node = Arc::new(MockNode::new());
        node.set_shard_loads(loads(&[("shard-1", 0.20), ("shard-2", 0.60), ("shard-3", 0.55)]));
        let policy = scaling_policy(&node);
        let failures = FailureTracker::new();

        let decision = policy.evaluate(ctx(&failures)).await.unwrap();
        let TriggerDecision::Act(request) = decision else {
            panic!("expected merge");
        };
        assert_eq!(request.subject, "shard-1");
        assert_eq!(request.payload["op"], "merge");

        policy.act(&request).await.unwrap();
        assert_eq!(node.calls_for("merge_shard"), 1);
    }

    #[tokio::test]
    async fn test_merge_respects_min_shard_count() {
        let node = Arc::new(MockNode::new());
        // Two shards is the configured minimum; the idle one must survive.
        node.set_shard_loads(loads(&[("shard-1", 0.10), ("shard-2", 0.60)]));
        let policy = scaling_policy(&node);
        let failures = FailureTracker::new();

        let decision = policy.evaluate(ctx(&failures)).await.unwrap();
        assert_eq!(decision, TriggerDecision::NoAction);
    }

    #[tokio::test]
    async fn test_split_threshold_is_inclusive() {
        let node = Arc::new(MockNode::new());
        node.set_shard_loads(loads(&[("shard-1", 0.75)]));
        let policy = scaling_policy(&node);
        let failures = FailureTracker::new();

        let decision = policy.evaluate(ctx(&failures)).await.unwrap();
        assert!(decision.is_act());
    }

    #[tokio::test]
    async fn test_hint_narrows_to_one_shard() {
        let node = Arc::new(MockNode::new());
        node.set_shard_loads(loads(&[("shard-1", 0.90), ("shard-2", 0.85)]));
        let policy = scaling_policy(&node);
        let failures = FailureTracker::new();
        let hint = json!("shard-2");

        let decision = policy
            .evaluate(EvalContext { now_ms: 0, hint: Some(&hint), failures: &failures })
            .await
            .unwrap();
        let TriggerDecision::Act(request) = decision else {
            panic!("expected act");
        };
        assert_eq!(request.subject, "shard-2");
    }

    #[tokio::test]
    async fn test_transfer_validates_then_executes() {
        let node = Arc::new(MockNode::new());
        node.set_transfers(vec!["xfer-1".to_string()]);
        let policy = TransferPolicy::new(node.clone(), &ShardTransferConfig::default());
        let failures = FailureTracker::new();

        let decision = policy.evaluate(ctx(&failures)).await.unwrap();
        let TriggerDecision::Act(request) = decision else {
            panic!("expected transfer");
        };

        let result = policy.act(&request).await.unwrap();
        assert!(matches!(result, ActionResult::Executed(_)));
        assert_eq!(node.calls_for("validate_transfer"), 1);
        assert_eq!(node.calls_for("execute_transfer"), 1);
        assert!(node.pending_transfers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_transfer_is_rejected_not_executed() {
        let node = Arc::new(MockNode::new());
        node.set_transfers(vec!["xfer-bad".to_string()]);
        node.reject("xfer-bad");
        let policy = TransferPolicy::new(node.clone(), &ShardTransferConfig::default());
        let failures = FailureTracker::new();

        let decision = policy.evaluate(ctx(&failures)).await.unwrap();
        let TriggerDecision::Act(request) = decision else {
            panic!("expected transfer");
        };

        let result = policy.act(&request).await.unwrap();
        assert!(matches!(result, ActionResult::Rejected(_)));
        assert_eq!(node.calls_for("execute_transfer"), 0);
    }

    #[tokio::test]
    async fn test_no_pending_transfers_is_idle() {
        let node = Arc::new(MockNode::new());
        let policy = TransferPolicy::new(node.clone(), &ShardTransferConfig::default());
        let failures = FailureTracker::new();

        let decision = policy.evaluate(ctx(&failures)).await.unwrap();
        assert_eq!(decision, TriggerDecision::NoAction);
    }
}
