//! Control plane configuration.
//!
//! One section per standard policy, loaded from YAML. Every field has a
//! default, so a partial file (or none at all) yields a runnable catalogue.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, WardenError};

/// Tunables for the standard policy catalogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    #[serde(rename = "shard-scaling")]
    pub shard_scaling: ShardScalingConfig,

    #[serde(rename = "shard-transfers")]
    pub shard_transfers: ShardTransferConfig,

    #[serde(rename = "validator-rotation")]
    pub validator_rotation: ValidatorRotationConfig,

    #[serde(rename = "key-rotation")]
    pub key_rotation: KeyRotationConfig,

    #[serde(rename = "ddos-mitigation")]
    pub ddos_mitigation: DdosMitigationConfig,

    #[serde(rename = "version-rollout")]
    pub version_rollout: VersionRolloutConfig,

    pub hotfixes: HotfixConfig,

    pub finalization: FinalizationConfig,

    #[serde(rename = "batch-execution")]
    pub batch_execution: BatchExecutionConfig,

    pub governance: GovernanceConfig,

    #[serde(rename = "resource-rebalance")]
    pub resource_rebalance: ResourceRebalanceConfig,

    #[serde(rename = "reboot-supervision")]
    pub reboot_supervision: RebootSupervisionConfig,

    #[serde(rename = "cache-pressure")]
    pub cache_pressure: CachePressureConfig,

    #[serde(rename = "carbon-offsets")]
    pub carbon_offsets: CarbonOffsetConfig,

    #[serde(rename = "renewable-compliance")]
    pub renewable_compliance: RenewableComplianceConfig,
}

impl ControlPlaneConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| WardenError::Config(format!("failed to parse config: {e}")))
    }

    /// Reject configurations the registry must not run with.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("shard-scaling", self.shard_scaling.poll_interval_secs),
            ("shard-transfers", self.shard_transfers.poll_interval_secs),
            ("validator-rotation", self.validator_rotation.poll_interval_secs),
            ("key-rotation", self.key_rotation.poll_interval_secs),
            ("ddos-mitigation", self.ddos_mitigation.poll_interval_secs),
            ("version-rollout", self.version_rollout.poll_interval_secs),
            ("hotfixes", self.hotfixes.poll_interval_secs),
            ("finalization", self.finalization.poll_interval_secs),
            ("batch-execution", self.batch_execution.poll_interval_secs),
            ("governance", self.governance.poll_interval_secs),
            ("resource-rebalance", self.resource_rebalance.poll_interval_secs),
            ("reboot-supervision", self.reboot_supervision.poll_interval_secs),
            ("cache-pressure", self.cache_pressure.poll_interval_secs),
            ("carbon-offsets", self.carbon_offsets.poll_interval_secs),
            ("renewable-compliance", self.renewable_compliance.poll_interval_secs),
        ];
        for (section, secs) in intervals {
            if secs == 0 {
                return Err(WardenError::Config(format!(
                    "{section}.poll-interval-secs must be > 0"
                )));
            }
        }

        if self.shard_scaling.split_threshold <= self.shard_scaling.merge_threshold {
            return Err(WardenError::Config(
                "shard-scaling.split-threshold must be > merge-threshold".to_string(),
            ));
        }
        if self.shard_scaling.min_shard_count == 0 {
            return Err(WardenError::Config(
                "shard-scaling.min-shard-count must be > 0".to_string(),
            ));
        }
        if self.validator_rotation.batch_size == 0 {
            return Err(WardenError::Config(
                "validator-rotation.batch-size must be > 0".to_string(),
            ));
        }
        if self.ddos_mitigation.rate_threshold <= 0.0 {
            return Err(WardenError::Config(
                "ddos-mitigation.rate-threshold must be > 0".to_string(),
            ));
        }
        if self.ddos_mitigation.block_ttl_secs == 0 {
            return Err(WardenError::Config(
                "ddos-mitigation.block-ttl-secs must be > 0".to_string(),
            ));
        }
        if self.key_rotation.max_age_days == 0 {
            return Err(WardenError::Config(
                "key-rotation.max-age-days must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.governance.approval_threshold) {
            return Err(WardenError::Config(
                "governance.approval-threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.reboot_supervision.escalation_limit == 0 {
            return Err(WardenError::Config(
                "reboot-supervision.escalation-limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shard split/merge by load, with a hysteresis band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardScalingConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Load ratio at or above which a shard is split.
    #[serde(rename = "split-threshold")]
    pub split_threshold: f64,

    /// Load ratio at or below which a shard is merged.
    #[serde(rename = "merge-threshold")]
    pub merge_threshold: f64,

    /// Merges never reduce the shard count below this.
    #[serde(rename = "min-shard-count")]
    pub min_shard_count: usize,
}

impl Default for ShardScalingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            split_threshold: 0.75,
            merge_threshold: 0.25,
            min_shard_count: 2,
        }
    }
}

/// Cross-shard transfer validation and execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardTransferConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ShardTransferConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 120,
            max_retries: 1,
            retry_backoff_ms: 0,
        }
    }
}

/// Validator rotation by uptime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorRotationConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Validators at or below this uptime are rotated out.
    #[serde(rename = "min-uptime")]
    pub min_uptime: f64,

    /// At most this many validators are rotated per cycle.
    #[serde(rename = "batch-size")]
    pub batch_size: usize,
}

impl Default for ValidatorRotationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            min_uptime: 0.75,
            batch_size: 5,
        }
    }
}

/// Signing-key rotation by age.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRotationConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Keys strictly older than this are rotated.
    #[serde(rename = "max-age-days")]
    pub max_age_days: i64,

    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for KeyRotationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            max_age_days: 30,
            max_retries: 2,
            retry_backoff_ms: 0,
        }
    }
}

/// Request-rate blacklisting with automatic expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DdosMitigationConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Requests per second at or above which a source is blocked.
    #[serde(rename = "rate-threshold")]
    pub rate_threshold: f64,

    /// How long a blocked source stays blacklisted.
    #[serde(rename = "block-ttl-secs")]
    pub block_ttl_secs: u64,

    /// Sources never blocked regardless of rate.
    pub whitelist: Vec<String>,
}

impl Default for DdosMitigationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            rate_threshold: 1000.0,
            block_ttl_secs: 1800,
            whitelist: Vec::new(),
        }
    }
}

/// Version validation and rollout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionRolloutConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,
}

impl Default for VersionRolloutConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 600,
        }
    }
}

/// Hotfix application with bounded retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotfixConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for HotfixConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            max_retries: 2,
            retry_backoff_ms: 0,
        }
    }
}

/// Sub-block finalization by pending count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizationConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Pending sub-blocks at or above which finalization runs.
    #[serde(rename = "pending-threshold")]
    pub pending_threshold: u64,
}

impl Default for FinalizationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            pending_threshold: 100,
        }
    }
}

/// Transaction-batch validation and execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchExecutionConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for BatchExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            max_retries: 1,
            retry_backoff_ms: 0,
        }
    }
}

/// Governance-proposal approval and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Approval ratio at or above which a proposal passes.
    #[serde(rename = "approval-threshold")]
    pub approval_threshold: f64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 600,
            approval_threshold: 0.5,
        }
    }
}

/// Node rebalancing on CPU/memory overload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRebalanceConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    #[serde(rename = "cpu-threshold")]
    pub cpu_threshold: f64,

    #[serde(rename = "memory-threshold")]
    pub memory_threshold: f64,
}

impl Default for ResourceRebalanceConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            cpu_threshold: 0.9,
            memory_threshold: 0.9,
        }
    }
}

/// Unhealthy-node reboots with failure-count escalation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebootSupervisionConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Consecutive exhausted failures per node before escalation.
    #[serde(rename = "escalation-limit")]
    pub escalation_limit: u32,
}

impl Default for RebootSupervisionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            max_retries: 1,
            retry_backoff_ms: 0,
            escalation_limit: 3,
        }
    }
}

/// Cache purge on usage pressure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePressureConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Cache usage ratio at or above which the cache is purged.
    #[serde(rename = "usage-threshold")]
    pub usage_threshold: f64,
}

impl Default for CachePressureConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 120,
            usage_threshold: 0.8,
        }
    }
}

/// Carbon-offset purchases for high-intensity nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonOffsetConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Grams CO2 per kWh at or above which offsets are purchased.
    #[serde(rename = "intensity-threshold")]
    pub intensity_threshold: f64,
}

impl Default for CarbonOffsetConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            intensity_threshold: 400.0,
        }
    }
}

/// Renewable-energy migration for non-compliant nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewableComplianceConfig {
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Renewable ratio at or below which a migration is scheduled.
    #[serde(rename = "min-renewable-ratio")]
    pub min_renewable_ratio: f64,
}

impl Default for RenewableComplianceConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            min_renewable_ratio: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ControlPlaneConfig::default();
        assert_eq!(config.shard_scaling.split_threshold, 0.75);
        assert_eq!(config.shard_scaling.merge_threshold, 0.25);
        assert_eq!(config.validator_rotation.batch_size, 5);
        assert_eq!(config.validator_rotation.min_uptime, 0.75);
        assert_eq!(config.ddos_mitigation.rate_threshold, 1000.0);
        assert_eq!(config.ddos_mitigation.block_ttl_secs, 1800);
        assert_eq!(config.key_rotation.max_retries, 2);
        assert_eq!(config.reboot_supervision.escalation_limit, 3);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(ControlPlaneConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml_keeps_defaults() {
        let yaml = r#"
shard-scaling:
  split-threshold: 0.9
  merge-threshold: 0.1
ddos-mitigation:
  rate-threshold: 500
  whitelist:
    - 10.0.0.1
"#;
        let config = ControlPlaneConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.shard_scaling.split_threshold, 0.9);
        assert_eq!(config.shard_scaling.merge_threshold, 0.1);
        // Untouched fields keep their defaults.
        assert_eq!(config.shard_scaling.poll_interval_secs, 60);
        assert_eq!(config.ddos_mitigation.rate_threshold, 500.0);
        assert_eq!(config.ddos_mitigation.whitelist, vec!["10.0.0.1"]);
        assert_eq!(config.validator_rotation.batch_size, 5);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = ControlPlaneConfig::default();
        config.finalization.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let mut config = ControlPlaneConfig::default();
        config.shard_scaling.split_threshold = 0.2;
        config.shard_scaling.merge_threshold = 0.8;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("split-threshold"));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = ControlPlaneConfig::default();
        config.validator_rotation.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_escalation_limit() {
        let mut config = ControlPlaneConfig::default();
        config.reboot_supervision.escalation_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "governance:\n  approval-threshold: 0.66").unwrap();

        let config = ControlPlaneConfig::load(file.path()).unwrap();
        assert_eq!(config.governance.approval_threshold, 0.66);
        assert_eq!(config.governance.poll_interval_secs, 600);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = ControlPlaneConfig::load("/nonexistent/warden.yml").unwrap_err();
        assert!(matches!(err, WardenError::Io(_)));
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let err = ControlPlaneConfig::from_yaml("shard-scaling: [not, a, map]").unwrap_err();
        assert!(matches!(err, WardenError::Config(_)));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = ControlPlaneConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back = ControlPlaneConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back.key_rotation.max_age_days, config.key_rotation.max_age_days);
        assert_eq!(back.cache_pressure.usage_threshold, config.cache_pressure.usage_threshold);
    }
}
