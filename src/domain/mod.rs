//! Domain types for warden
//!
//! This module contains the core types that flow through one control cycle:
//! - LoopSpec: immutable per-loop configuration (id, interval, retry budget)
//! - TriggerDecision / ActionRequest: what the evaluator decided
//! - ActionResult: what the executor observed
//! - Outcome: what the whole cycle produced
//! - AuditRecord / AuditStatus: what the ledger persists

pub mod decision;
pub mod outcome;
pub mod record;
pub mod spec;

pub use decision::{ActionRequest, ActionResult, TriggerDecision};
pub use outcome::Outcome;
pub use record::{AuditRecord, AuditStatus};
pub use spec::LoopSpec;
