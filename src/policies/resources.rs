//! Node-resource policies: rebalancing, reboots, cache pressure, energy.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::{
    CachePressureConfig, CarbonOffsetConfig, RebootSupervisionConfig, RenewableComplianceConfig,
    ResourceRebalanceConfig,
};
use crate::domain::{ActionRequest, ActionResult, TriggerDecision};
use crate::engine::ResourceManager;
use crate::error::Result;
use crate::runner::{EvalContext, Policy};
use crate::thresholds::Threshold;

/// Rebalances nodes whose CPU or memory utilization breaches its ceiling.
pub struct ResourceRebalancePolicy {
    resources: Arc<dyn ResourceManager>,
    cpu_ceiling: Threshold,
    memory_ceiling: Threshold,
}

impl ResourceRebalancePolicy {
    pub fn new(resources: Arc<dyn ResourceManager>, config: &ResourceRebalanceConfig) -> Self {
        Self {
            resources,
            cpu_ceiling: Threshold::Ceiling(config.cpu_threshold),
            memory_ceiling: Threshold::Ceiling(config.memory_threshold),
        }
    }
}

#[async_trait]
impl Policy for ResourceRebalancePolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let nodes = self.resources.node_resources().await?;
        for node in nodes {
            if let Some(subject) = ctx.hint_subject() {
                if node.node_id != subject {
                    continue;
                }
            }
            if self.cpu_ceiling.is_breached(node.cpu)
                || self.memory_ceiling.is_breached(node.memory)
            {
                return Ok(TriggerDecision::act(
                    node.node_id,
                    json!({ "op": "rebalance", "cpu": node.cpu, "memory": node.memory }),
                ));
            }
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        self.resources.rebalance_node(&request.subject).await?;
        Ok(ActionResult::Executed(json!({ "rebalanced": request.subject })))
    }
}

/// Reboots unhealthy nodes, escalating after repeated failed reboots.
///
/// A node whose consecutive failures already reached the escalation limit is
/// skipped during evaluation: its escalated outcome is on the ledger and
/// further automated reboots are pointless until an operator clears the
/// counter through the loop's subject-removal hook.
pub struct RebootSupervisionPolicy {
    resources: Arc<dyn ResourceManager>,
    escalation_limit: u32,
}

impl RebootSupervisionPolicy {
    pub fn new(resources: Arc<dyn ResourceManager>, config: &RebootSupervisionConfig) -> Self {
        Self {
            resources,
            escalation_limit: config.escalation_limit,
        }
    }
}

#[async_trait]
impl Policy for RebootSupervisionPolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let nodes = self.resources.node_health().await?;
        for node in nodes {
            if node.healthy {
                continue;
            }
            if let Some(subject) = ctx.hint_subject() {
                if node.node_id != subject {
                    continue;
                }
            }
            if ctx.failures.consecutive(&node.node_id) >= self.escalation_limit {
                continue;
            }
            return Ok(TriggerDecision::act(node.node_id, json!({ "op": "reboot" })));
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        self.resources.reboot_node(&request.subject).await?;
        Ok(ActionResult::Executed(json!({ "rebooted": request.subject })))
    }
}

/// Purges a node's cache once its fill ratio reaches the ceiling.
pub struct CachePressurePolicy {
    resources: Arc<dyn ResourceManager>,
    usage_ceiling: Threshold,
}

impl CachePressurePolicy {
    pub fn new(resources: Arc<dyn ResourceManager>, config: &CachePressureConfig) -> Self {
        Self {
            resources,
            usage_ceiling: Threshold::Ceiling(config.usage_threshold),
        }
    }
}

#[async_trait]
impl Policy for CachePressurePolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let caches = self.resources.cache_usage().await?;
        for cache in caches {
            if let Some(subject) = ctx.hint_subject() {
                if cache.node_id != subject {
                    continue;
                }
            }
            if self.usage_ceiling.is_breached(cache.usage) {
                return Ok(TriggerDecision::act(
                    cache.node_id,
                    json!({ "op": "purge", "usage": cache.usage }),
                ));
            }
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        self.resources.purge_cache(&request.subject).await?;
        Ok(ActionResult::Executed(json!({ "purged": request.subject })))
    }
}

/// Purchases carbon offsets for nodes whose intensity breaches the ceiling.
pub struct CarbonOffsetPolicy {
    resources: Arc<dyn ResourceManager>,
    intensity_ceiling: Threshold,
}

impl CarbonOffsetPolicy {
    pub fn new(resources: Arc<dyn ResourceManager>, config: &CarbonOffsetConfig) -> Self {
        Self {
            resources,
            intensity_ceiling: Threshold::Ceiling(config.intensity_threshold),
        }
    }
}

#[async_trait]
impl Policy for CarbonOffsetPolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let profiles = self.resources.energy_profiles().await?;
        for profile in profiles {
            if let Some(subject) = ctx.hint_subject() {
                if profile.node_id != subject {
                    continue;
                }
            }
            if self.intensity_ceiling.is_breached(profile.carbon_intensity) {
                return Ok(TriggerDecision::act(
                    profile.node_id,
                    json!({ "op": "offset", "carbon-intensity": profile.carbon_intensity }),
                ));
            }
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        self.resources.purchase_offsets(&request.subject).await?;
        Ok(ActionResult::Executed(json!({ "offsets-for": request.subject })))
    }
}

/// Schedules renewable migration for nodes below the renewable floor.
pub struct RenewableCompliancePolicy {
    resources: Arc<dyn ResourceManager>,
    renewable_floor: Threshold,
}

impl RenewableCompliancePolicy {
    pub fn new(resources: Arc<dyn ResourceManager>, config: &RenewableComplianceConfig) -> Self {
        Self {
            resources,
            renewable_floor: Threshold::Floor(config.min_renewable_ratio),
        }
    }
}

#[async_trait]
impl Policy for RenewableCompliancePolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        let profiles = self.resources.energy_profiles().await?;
        for profile in profiles {
            if let Some(subject) = ctx.hint_subject() {
                if profile.node_id != subject {
                    continue;
                }
            }
            if self.renewable_floor.is_breached(profile.renewable_ratio) {
                return Ok(TriggerDecision::act(
                    profile.node_id,
                    json!({ "op": "migrate", "renewable-ratio": profile.renewable_ratio }),
                ));
            }
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        self.resources
            .schedule_renewable_migration(&request.subject)
            .await?;
        Ok(ActionResult::Executed(json!({ "migration-for": request.subject })))
    }
}
