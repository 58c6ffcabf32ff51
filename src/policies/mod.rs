//! Concrete policy catalogue and the standard control-plane wiring.
//!
//! Every policy here is the same machinery parameterized differently: a
//! metric fetch, a threshold check, and one collaborator call. The
//! [`standard_registry`] constructor assembles the full catalogue from a
//! [`ControlPlaneConfig`] so embedders get the whole control plane in one
//! call and can still register extra loops before starting it.

use std::sync::Arc;
use std::time::Duration;

use crate::audit::AuditLogger;
use crate::config::ControlPlaneConfig;
use crate::domain::LoopSpec;
use crate::engine::{ConsensusEngine, NetworkManager, ResourceManager, ShardManager};
use crate::error::Result;
use crate::id::{Clock, SystemClock};
use crate::registry::Registry;

mod consensus;
mod network;
mod resources;
mod shards;
mod validators;

pub use consensus::{
    BatchExecutionPolicy, FinalizationPolicy, GovernancePolicy, HotfixPolicy,
    VersionRolloutPolicy,
};
pub use network::DdosMitigationPolicy;
pub use resources::{
    CachePressurePolicy, CarbonOffsetPolicy, RebootSupervisionPolicy,
    RenewableCompliancePolicy, ResourceRebalancePolicy,
};
pub use shards::{ShardScalingPolicy, TransferPolicy};
pub use validators::{KeyRotationPolicy, ValidatorRotationPolicy};

/// Handles to the four external planes the catalogue acts on.
///
/// The planes are separate traits so deployments can back them with
/// different services; [`EngineHandles::shared`] covers the common case of
/// one embedded node implementing all four.
#[derive(Clone)]
pub struct EngineHandles {
    pub consensus: Arc<dyn ConsensusEngine>,
    pub shards: Arc<dyn ShardManager>,
    pub resources: Arc<dyn ResourceManager>,
    pub network: Arc<dyn NetworkManager>,
}

impl EngineHandles {
    pub fn new(
        consensus: Arc<dyn ConsensusEngine>,
        shards: Arc<dyn ShardManager>,
        resources: Arc<dyn ResourceManager>,
        network: Arc<dyn NetworkManager>,
    ) -> Self {
        Self { consensus, shards, resources, network }
    }

    /// Wires all four planes to a single backend.
    pub fn shared<T>(node: Arc<T>) -> Self
    where
        T: ConsensusEngine + ShardManager + ResourceManager + NetworkManager + 'static,
    {
        Self {
            consensus: node.clone(),
            shards: node.clone(),
            resources: node.clone(),
            network: node,
        }
    }
}

fn with_retries(spec: LoopSpec, max_retries: u32, backoff_ms: u64) -> LoopSpec {
    let spec = spec.with_max_retries(max_retries);
    if backoff_ms == 0 {
        spec
    } else {
        spec.with_retry_backoff(Duration::from_millis(backoff_ms))
    }
}

/// Builds a registry holding the standard policy catalogue.
///
/// The registry is returned stopped; callers may register additional loops
/// before calling [`Registry::start`]. Loop ids double as audit categories.
pub fn standard_registry(
    config: &ControlPlaneConfig,
    handles: EngineHandles,
    audit: Arc<AuditLogger>,
) -> Result<Registry> {
    standard_registry_with_clock(config, handles, audit, Arc::new(SystemClock))
}

/// [`standard_registry`] with an explicit clock, for tests exercising TTL
/// and age-based policies without waiting on wall time.
pub fn standard_registry_with_clock(
    config: &ControlPlaneConfig,
    handles: EngineHandles,
    audit: Arc<AuditLogger>,
    clock: Arc<dyn Clock>,
) -> Result<Registry> {
    config.validate()?;
    let mut registry = Registry::new(audit).with_clock(clock.clone());

    let cfg = &config.shard_scaling;
    registry.register(
        LoopSpec::new("shard-scaling", "shard-scaling", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(ShardScalingPolicy::new(handles.shards.clone(), cfg)?),
    )?;

    let cfg = &config.shard_transfers;
    registry.register(
        with_retries(
            LoopSpec::new("shard-transfers", "shard-transfers", Duration::from_secs(cfg.poll_interval_secs)),
            cfg.max_retries,
            cfg.retry_backoff_ms,
        ),
        Arc::new(TransferPolicy::new(handles.shards.clone(), cfg)),
    )?;

    let cfg = &config.validator_rotation;
    registry.register(
        LoopSpec::new("validator-rotation", "validator-rotation", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(ValidatorRotationPolicy::new(handles.consensus.clone(), cfg)),
    )?;

    let cfg = &config.key_rotation;
    registry.register(
        with_retries(
            LoopSpec::new("key-rotation", "key-rotation", Duration::from_secs(cfg.poll_interval_secs)),
            cfg.max_retries,
            cfg.retry_backoff_ms,
        ),
        Arc::new(KeyRotationPolicy::new(handles.consensus.clone(), cfg)),
    )?;

    let cfg = &config.ddos_mitigation;
    registry.register(
        LoopSpec::new("ddos-mitigation", "ddos-mitigation", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(DdosMitigationPolicy::new(handles.network.clone(), cfg, clock.clone())),
    )?;

    let cfg = &config.version_rollout;
    registry.register(
        LoopSpec::new("version-rollout", "version-rollout", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(VersionRolloutPolicy::new(handles.consensus.clone(), cfg)),
    )?;

    let cfg = &config.hotfixes;
    registry.register(
        with_retries(
            LoopSpec::new("hotfixes", "hotfixes", Duration::from_secs(cfg.poll_interval_secs)),
            cfg.max_retries,
            cfg.retry_backoff_ms,
        ),
        Arc::new(HotfixPolicy::new(handles.consensus.clone(), cfg)),
    )?;

    let cfg = &config.finalization;
    registry.register(
        LoopSpec::new("finalization", "finalization", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(FinalizationPolicy::new(handles.consensus.clone(), cfg)),
    )?;

    let cfg = &config.batch_execution;
    registry.register(
        with_retries(
            LoopSpec::new("batch-execution", "batch-execution", Duration::from_secs(cfg.poll_interval_secs)),
            cfg.max_retries,
            cfg.retry_backoff_ms,
        ),
        Arc::new(BatchExecutionPolicy::new(handles.consensus.clone(), cfg)),
    )?;

    let cfg = &config.governance;
    registry.register(
        LoopSpec::new("governance", "governance", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(GovernancePolicy::new(handles.consensus.clone(), cfg)),
    )?;

    let cfg = &config.resource_rebalance;
    registry.register(
        LoopSpec::new("resource-rebalance", "resource-rebalance", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(ResourceRebalancePolicy::new(handles.resources.clone(), cfg)),
    )?;

    let cfg = &config.reboot_supervision;
    registry.register(
        with_retries(
            LoopSpec::new("reboot-supervision", "reboot-supervision", Duration::from_secs(cfg.poll_interval_secs)),
            cfg.max_retries,
            cfg.retry_backoff_ms,
        )
        .with_escalation_limit(cfg.escalation_limit),
        Arc::new(RebootSupervisionPolicy::new(handles.resources.clone(), cfg)),
    )?;

    let cfg = &config.cache_pressure;
    registry.register(
        LoopSpec::new("cache-pressure", "cache-pressure", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(CachePressurePolicy::new(handles.resources.clone(), cfg)),
    )?;

    let cfg = &config.carbon_offsets;
    registry.register(
        LoopSpec::new("carbon-offsets", "carbon-offsets", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(CarbonOffsetPolicy::new(handles.resources.clone(), cfg)),
    )?;

    let cfg = &config.renewable_compliance;
    registry.register(
        LoopSpec::new("renewable-compliance", "renewable-compliance", Duration::from_secs(cfg.poll_interval_secs)),
        Arc::new(RenewableCompliancePolicy::new(handles.resources.clone(), cfg)),
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::StubCipher;
    use crate::domain::Outcome;
    use crate::engine::MockNode;
    use crate::error::WardenError;
    use crate::ledger::MemoryLedger;

    fn audit() -> Arc<AuditLogger> {
        Arc::new(AuditLogger::new(
            Arc::new(StubCipher::new()),
            Arc::new(MemoryLedger::new()),
        ))
    }

    #[tokio::test]
    async fn test_standard_registry_holds_the_full_catalogue() {
        let node = Arc::new(MockNode::new());
        let registry = standard_registry(
            &ControlPlaneConfig::default(),
            EngineHandles::shared(node),
            audit(),
        )
        .unwrap();

        assert_eq!(
            registry.loop_ids(),
            vec![
                "batch-execution",
                "cache-pressure",
                "carbon-offsets",
                "ddos-mitigation",
                "finalization",
                "governance",
                "hotfixes",
                "key-rotation",
                "reboot-supervision",
                "renewable-compliance",
                "resource-rebalance",
                "shard-scaling",
                "shard-transfers",
                "validator-rotation",
                "version-rollout",
            ]
        );
    }

    #[tokio::test]
    async fn test_catalogue_is_idle_against_a_quiet_node() {
        let node = Arc::new(MockNode::new());
        let registry = standard_registry(
            &ControlPlaneConfig::default(),
            EngineHandles::shared(node),
            audit(),
        )
        .unwrap();

        for id in registry.loop_ids() {
            let outcome = registry.trigger_manually(&id, None).await.unwrap();
            assert_eq!(outcome, Outcome::Idle, "loop {id} acted on an empty node");
        }
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = ControlPlaneConfig::default();
        config.shard_scaling.split_threshold = 0.2;
        config.shard_scaling.merge_threshold = 0.8;

        let node = Arc::new(MockNode::new());
        let err = standard_registry(&config, EngineHandles::shared(node), audit())
            .unwrap_err();
        assert!(matches!(err, WardenError::Config(_)));
    }
}
