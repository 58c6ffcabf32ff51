//! Warden - a node-operations control plane for distributed ledger nodes
//!
//! Warden runs a catalogue of periodic control loops. Each loop evaluates one
//! policy against live metrics, executes a corrective action when a threshold
//! is breached, retries with bounded escalation, and writes an encrypted
//! audit entry to the ledger.

pub mod audit;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod engine;
pub mod error;
pub mod id;
pub mod ledger;
pub mod policies;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod thresholds;
pub mod ttl;

pub use audit::AuditLogger;
pub use config::ControlPlaneConfig;
pub use domain::{ActionRequest, ActionResult, LoopSpec, Outcome, TriggerDecision};
pub use error::{Result, WardenError};
pub use policies::{standard_registry, standard_registry_with_clock, EngineHandles};
pub use registry::Registry;
pub use runner::{ControlLoop, EvalContext, LoopStatus, Policy};
