//! Scripted collaborator for tests.
//!
//! `MockNode` implements all four collaborator interfaces against in-memory
//! state. Tests script the metrics with `set_*`, inject failures per
//! operation with `fail_op`, mark validation rejections with `reject`, and
//! assert behavior through the recorded call log. Mutators apply the obvious
//! state change (a rotated validator reads full uptime, a rebooted node reads
//! healthy, an executed batch leaves the pending list); shard topology and
//! firewall calls are recorded only, their metrics stay test-driven.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::traits::{ConsensusEngine, NetworkManager, ResourceManager, ShardManager};
use crate::engine::types::{
    CacheUsage, EnergyProfile, KeyInfo, NodeHealth, NodeResources, Proposal, RequestRate,
    ShardLoad, ValidatorStatus,
};
use crate::error::{Result, WardenError};
use crate::id::now_ms;

#[derive(Debug, Default)]
struct MockState {
    validators: Vec<ValidatorStatus>,
    keys: Vec<KeyInfo>,
    pending_subblocks: u64,
    batches: Vec<String>,
    proposals: Vec<Proposal>,
    current_version: String,
    available_version: Option<String>,
    hotfixes: Vec<String>,
    shard_loads: Vec<ShardLoad>,
    transfers: Vec<String>,
    node_resources: Vec<NodeResources>,
    node_health: Vec<NodeHealth>,
    cache_usage: Vec<CacheUsage>,
    energy_profiles: Vec<EnergyProfile>,
    request_rates: Vec<RequestRate>,
    rotations: u32,
    calls: Vec<String>,
    fail_ops: HashMap<String, u32>,
    rejections: HashSet<String>,
}

impl MockState {
    fn record(&mut self, op: &str, args: &str) {
        if args.is_empty() {
            self.calls.push(op.to_string());
        } else {
            self.calls.push(format!("{op}:{args}"));
        }
    }

    fn check_fail(&mut self, op: &str) -> Result<()> {
        if let Some(remaining) = self.fail_ops.get_mut(op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(WardenError::Engine(format!("{op} failed (injected)")));
            }
        }
        Ok(())
    }

    fn enter(&mut self, op: &str, args: &str) -> Result<()> {
        self.record(op, args);
        self.check_fail(op)
    }
}

/// In-memory node implementing every collaborator interface.
#[derive(Debug, Default)]
pub struct MockNode {
    state: Mutex<MockState>,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    // -- scripting ---------------------------------------------------------

    pub fn set_validators(&self, validators: Vec<ValidatorStatus>) {
        self.lock().validators = validators;
    }

    pub fn set_keys(&self, keys: Vec<KeyInfo>) {
        self.lock().keys = keys;
    }

    pub fn set_pending_subblocks(&self, count: u64) {
        self.lock().pending_subblocks = count;
    }

    pub fn set_batches(&self, batches: Vec<String>) {
        self.lock().batches = batches;
    }

    pub fn set_proposals(&self, proposals: Vec<Proposal>) {
        self.lock().proposals = proposals;
    }

    pub fn set_current_version(&self, version: &str) {
        self.lock().current_version = version.to_string();
    }

    pub fn set_available_version(&self, version: Option<&str>) {
        self.lock().available_version = version.map(str::to_string);
    }

    pub fn set_hotfixes(&self, hotfixes: Vec<String>) {
        self.lock().hotfixes = hotfixes;
    }

    pub fn set_shard_loads(&self, loads: Vec<ShardLoad>) {
        self.lock().shard_loads = loads;
    }

    pub fn set_transfers(&self, transfers: Vec<String>) {
        self.lock().transfers = transfers;
    }

    pub fn set_node_resources(&self, resources: Vec<NodeResources>) {
        self.lock().node_resources = resources;
    }

    pub fn set_node_health(&self, health: Vec<NodeHealth>) {
        self.lock().node_health = health;
    }

    pub fn set_cache_usage(&self, usage: Vec<CacheUsage>) {
        self.lock().cache_usage = usage;
    }

    pub fn set_energy_profiles(&self, profiles: Vec<EnergyProfile>) {
        self.lock().energy_profiles = profiles;
    }

    pub fn set_request_rates(&self, rates: Vec<RequestRate>) {
        self.lock().request_rates = rates;
    }

    /// Fail the next `times` invocations of `op` with an engine error.
    pub fn fail_op(&self, op: &str, times: u32) {
        self.lock().fail_ops.insert(op.to_string(), times);
    }

    /// Make `validate_batch`/`validate_transfer`/`validate_version` refuse this id.
    pub fn reject(&self, id: &str) {
        self.lock().rejections.insert(id.to_string());
    }

    // -- inspection --------------------------------------------------------

    /// Every invocation so far, `op` or `op:args`, failed attempts included.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// How many times `op` was invoked.
    pub fn calls_for(&self, op: &str) -> usize {
        let prefix = format!("{op}:");
        self.lock()
            .calls
            .iter()
            .filter(|call| *call == op || call.starts_with(&prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

#[async_trait]
impl ConsensusEngine for MockNode {
    async fn validator_uptimes(&self) -> Result<Vec<ValidatorStatus>> {
        let mut state = self.lock();
        state.enter("validator_uptimes", "")?;
        Ok(state.validators.clone())
    }

    async fn rotate_validators(&self, batch: &[String]) -> Result<()> {
        let mut state = self.lock();
        state.enter("rotate_validators", &batch.join(","))?;
        for validator in state.validators.iter_mut() {
            if batch.contains(&validator.id) {
                validator.uptime = 1.0;
            }
        }
        Ok(())
    }

    async fn signing_keys(&self) -> Result<Vec<KeyInfo>> {
        let mut state = self.lock();
        state.enter("signing_keys", "")?;
        Ok(state.keys.clone())
    }

    async fn rotate_key(&self, old_key_id: &str) -> Result<String> {
        let mut state = self.lock();
        state.enter("rotate_key", old_key_id)?;
        state.rotations += 1;
        let new_id = format!("{}-r{}", old_key_id, state.rotations);
        let replaced = state.keys.iter_mut().find(|key| key.id == old_key_id);
        match replaced {
            Some(key) => {
                key.id = new_id.clone();
                key.created_at_ms = now_ms();
                Ok(new_id)
            }
            None => Err(WardenError::Engine(format!("unknown key: {old_key_id}"))),
        }
    }

    async fn pending_subblocks(&self) -> Result<u64> {
        let mut state = self.lock();
        state.enter("pending_subblocks", "")?;
        Ok(state.pending_subblocks)
    }

    async fn finalize_subblocks(&self) -> Result<u64> {
        let mut state = self.lock();
        state.enter("finalize_subblocks", "")?;
        let folded = state.pending_subblocks;
        state.pending_subblocks = 0;
        Ok(folded)
    }

    async fn pending_batches(&self) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.enter("pending_batches", "")?;
        Ok(state.batches.clone())
    }

    async fn validate_batch(&self, batch_id: &str) -> Result<bool> {
        let mut state = self.lock();
        state.enter("validate_batch", batch_id)?;
        Ok(!state.rejections.contains(batch_id))
    }

    async fn execute_batch(&self, batch_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("execute_batch", batch_id)?;
        let before = state.batches.len();
        state.batches.retain(|id| id != batch_id);
        if state.batches.len() == before {
            return Err(WardenError::Engine(format!("unknown batch: {batch_id}")));
        }
        Ok(())
    }

    async fn proposals(&self) -> Result<Vec<Proposal>> {
        let mut state = self.lock();
        state.enter("proposals", "")?;
        Ok(state.proposals.clone())
    }

    async fn approve_proposal(&self, proposal_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("approve_proposal", proposal_id)?;
        state.proposals.retain(|p| p.id != proposal_id);
        Ok(())
    }

    async fn reject_proposal(&self, proposal_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("reject_proposal", proposal_id)?;
        state.proposals.retain(|p| p.id != proposal_id);
        Ok(())
    }

    async fn current_version(&self) -> Result<String> {
        let mut state = self.lock();
        state.enter("current_version", "")?;
        Ok(state.current_version.clone())
    }

    async fn available_version(&self) -> Result<Option<String>> {
        let mut state = self.lock();
        state.enter("available_version", "")?;
        Ok(state.available_version.clone())
    }

    async fn validate_version(&self, version: &str) -> Result<bool> {
        let mut state = self.lock();
        state.enter("validate_version", version)?;
        Ok(!state.rejections.contains(version))
    }

    async fn set_current_version(&self, version: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("set_current_version", version)?;
        state.current_version = version.to_string();
        state.available_version = None;
        Ok(())
    }

    async fn pending_hotfixes(&self) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.enter("pending_hotfixes", "")?;
        Ok(state.hotfixes.clone())
    }

    async fn apply_hotfix(&self, hotfix_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("apply_hotfix", hotfix_id)?;
        let before = state.hotfixes.len();
        state.hotfixes.retain(|id| id != hotfix_id);
        if state.hotfixes.len() == before {
            return Err(WardenError::Engine(format!("unknown hotfix: {hotfix_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ShardManager for MockNode {
    async fn shard_loads(&self) -> Result<Vec<ShardLoad>> {
        let mut state = self.lock();
        state.enter("shard_loads", "")?;
        Ok(state.shard_loads.clone())
    }

    async fn split_shard(&self, shard_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("split_shard", shard_id)?;
        Ok(())
    }

    async fn merge_shard(&self, shard_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("merge_shard", shard_id)?;
        Ok(())
    }

    async fn pending_transfers(&self) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.enter("pending_transfers", "")?;
        Ok(state.transfers.clone())
    }

    async fn validate_transfer(&self, transfer_id: &str) -> Result<bool> {
        let mut state = self.lock();
        state.enter("validate_transfer", transfer_id)?;
        Ok(!state.rejections.contains(transfer_id))
    }

    async fn execute_transfer(&self, transfer_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("execute_transfer", transfer_id)?;
        let before = state.transfers.len();
        state.transfers.retain(|id| id != transfer_id);
        if state.transfers.len() == before {
            return Err(WardenError::Engine(format!("unknown transfer: {transfer_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceManager for MockNode {
    async fn node_resources(&self) -> Result<Vec<NodeResources>> {
        let mut state = self.lock();
        state.enter("node_resources", "")?;
        Ok(state.node_resources.clone())
    }

    async fn rebalance_node(&self, node_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("rebalance_node", node_id)?;
        for node in state.node_resources.iter_mut() {
            if node.node_id == node_id {
                node.cpu = 0.5;
                node.memory = 0.5;
            }
        }
        Ok(())
    }

    async fn node_health(&self) -> Result<Vec<NodeHealth>> {
        let mut state = self.lock();
        state.enter("node_health", "")?;
        Ok(state.node_health.clone())
    }

    async fn reboot_node(&self, node_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("reboot_node", node_id)?;
        for node in state.node_health.iter_mut() {
            if node.node_id == node_id {
                node.healthy = true;
            }
        }
        Ok(())
    }

    async fn cache_usage(&self) -> Result<Vec<CacheUsage>> {
        let mut state = self.lock();
        state.enter("cache_usage", "")?;
        Ok(state.cache_usage.clone())
    }

    async fn purge_cache(&self, node_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("purge_cache", node_id)?;
        for cache in state.cache_usage.iter_mut() {
            if cache.node_id == node_id {
                cache.usage = 0.0;
            }
        }
        Ok(())
    }

    async fn energy_profiles(&self) -> Result<Vec<EnergyProfile>> {
        let mut state = self.lock();
        state.enter("energy_profiles", "")?;
        Ok(state.energy_profiles.clone())
    }

    async fn purchase_offsets(&self, node_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("purchase_offsets", node_id)?;
        Ok(())
    }

    async fn schedule_renewable_migration(&self, node_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("schedule_renewable_migration", node_id)?;
        Ok(())
    }
}

#[async_trait]
impl NetworkManager for MockNode {
    async fn request_rates(&self) -> Result<Vec<RequestRate>> {
        let mut state = self.lock();
        state.enter("request_rates", "")?;
        Ok(state.request_rates.clone())
    }

    async fn block_ip(&self, addr: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("block_ip", addr)?;
        Ok(())
    }

    async fn unblock_ip(&self, addr: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter("unblock_ip", addr)?;
        Ok(())
    }
}
