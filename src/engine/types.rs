//! Metric snapshots returned by the collaborator interfaces.

use serde::{Deserialize, Serialize};

/// Identity and uptime ratio for one validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorStatus {
    pub id: String,
    /// Fraction of recent duty slots served, 0.0..=1.0.
    pub uptime: f64,
}

/// Signing key metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub id: String,
    /// Unix milliseconds at key creation.
    pub created_at_ms: i64,
}

/// Governance proposal snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    /// Fraction of cast votes approving, 0.0..=1.0.
    pub approval_ratio: f64,
    /// Voting deadline, unix milliseconds.
    pub expires_at_ms: i64,
}

/// Load ratio on one shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardLoad {
    pub id: String,
    /// Utilization relative to shard capacity, 0.0..=1.0.
    pub load: f64,
}

/// CPU/memory utilization for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResources {
    pub node_id: String,
    pub cpu: f64,
    pub memory: f64,
}

/// Liveness flag for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHealth {
    pub node_id: String,
    pub healthy: bool,
}

/// Cache fill ratio for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheUsage {
    pub node_id: String,
    pub usage: f64,
}

/// Energy sourcing profile for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyProfile {
    pub node_id: String,
    /// Grams CO2 per kWh consumed.
    pub carbon_intensity: f64,
    /// Fraction of consumption from renewable sources, 0.0..=1.0.
    pub renewable_ratio: f64,
}

/// Observed request rate for one source address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRate {
    pub source: String,
    pub per_second: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_status_roundtrip() {
        let status = ValidatorStatus { id: "val-1".to_string(), uptime: 0.93 };
        let json = serde_json::to_string(&status).unwrap();
        let back: ValidatorStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, back);
    }

    #[test]
    fn test_proposal_fields() {
        let p = Proposal {
            id: "prop-7".to_string(),
            approval_ratio: 0.66,
            expires_at_ms: 1_000_000,
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["approval_ratio"], 0.66);
        assert_eq!(json["expires_at_ms"], 1_000_000);
    }
}
