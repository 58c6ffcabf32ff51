//! External collaborator interfaces.
//!
//! The consensus engine, shard manager, resource manager, and network
//! manager are externally synchronized singletons. The control plane calls
//! them through these traits and never assumes exclusive access; only a
//! loop's own evaluate→act→audit sequence is serialized.
//!
//! [`MockNode`] implements all four interfaces with scripted state, injected
//! failures, and a recorded call log for tests.

pub mod mock;
pub mod traits;
pub mod types;

pub use mock::MockNode;
pub use traits::{ConsensusEngine, NetworkManager, ResourceManager, ShardManager};
pub use types::{
    CacheUsage, EnergyProfile, KeyInfo, NodeHealth, NodeResources, Proposal, RequestRate,
    ShardLoad, ValidatorStatus,
};
