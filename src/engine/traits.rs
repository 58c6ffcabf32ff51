//! Collaborator trait definitions.
//!
//! Every method may fail with an engine error; none is assumed idempotent
//! unless the calling policy's retry logic treats it as such. Metric getters
//! take no arguments and return full snapshots; evaluators filter.

use async_trait::async_trait;

use crate::engine::types::{
    CacheUsage, EnergyProfile, KeyInfo, NodeHealth, NodeResources, Proposal, RequestRate,
    ShardLoad, ValidatorStatus,
};
use crate::error::Result;

/// Validator, key, version, governance, and block-production surface of the
/// consensus engine.
#[async_trait]
pub trait ConsensusEngine: Send + Sync {
    async fn validator_uptimes(&self) -> Result<Vec<ValidatorStatus>>;

    /// Rotate the given validators out of the active set in one batch call.
    async fn rotate_validators(&self, batch: &[String]) -> Result<()>;

    async fn signing_keys(&self) -> Result<Vec<KeyInfo>>;

    /// Retire `old_key_id` and return the replacement key id.
    async fn rotate_key(&self, old_key_id: &str) -> Result<String>;

    /// Sub-blocks accumulated since the last finalization.
    async fn pending_subblocks(&self) -> Result<u64>;

    /// Fold pending sub-blocks into a block; returns how many were folded.
    async fn finalize_subblocks(&self) -> Result<u64>;

    async fn pending_batches(&self) -> Result<Vec<String>>;
    async fn validate_batch(&self, batch_id: &str) -> Result<bool>;
    async fn execute_batch(&self, batch_id: &str) -> Result<()>;

    async fn proposals(&self) -> Result<Vec<Proposal>>;
    async fn approve_proposal(&self, proposal_id: &str) -> Result<()>;
    async fn reject_proposal(&self, proposal_id: &str) -> Result<()>;

    async fn current_version(&self) -> Result<String>;
    async fn available_version(&self) -> Result<Option<String>>;
    async fn validate_version(&self, version: &str) -> Result<bool>;
    async fn set_current_version(&self, version: &str) -> Result<()>;

    async fn pending_hotfixes(&self) -> Result<Vec<String>>;
    async fn apply_hotfix(&self, hotfix_id: &str) -> Result<()>;
}

/// Shard topology and cross-shard transfer surface.
#[async_trait]
pub trait ShardManager: Send + Sync {
    async fn shard_loads(&self) -> Result<Vec<ShardLoad>>;
    async fn split_shard(&self, shard_id: &str) -> Result<()>;
    async fn merge_shard(&self, shard_id: &str) -> Result<()>;

    async fn pending_transfers(&self) -> Result<Vec<String>>;
    async fn validate_transfer(&self, transfer_id: &str) -> Result<bool>;
    async fn execute_transfer(&self, transfer_id: &str) -> Result<()>;
}

/// Node capacity, health, cache, and energy surface.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    async fn node_resources(&self) -> Result<Vec<NodeResources>>;
    async fn rebalance_node(&self, node_id: &str) -> Result<()>;

    async fn node_health(&self) -> Result<Vec<NodeHealth>>;
    async fn reboot_node(&self, node_id: &str) -> Result<()>;

    async fn cache_usage(&self) -> Result<Vec<CacheUsage>>;
    async fn purge_cache(&self, node_id: &str) -> Result<()>;

    async fn energy_profiles(&self) -> Result<Vec<EnergyProfile>>;
    async fn purchase_offsets(&self, node_id: &str) -> Result<()>;
    async fn schedule_renewable_migration(&self, node_id: &str) -> Result<()>;
}

/// Ingress traffic surface.
#[async_trait]
pub trait NetworkManager: Send + Sync {
    async fn request_rates(&self) -> Result<Vec<RequestRate>>;
    async fn block_ip(&self, addr: &str) -> Result<()>;
    async fn unblock_ip(&self, addr: &str) -> Result<()>;
}
