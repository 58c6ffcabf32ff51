//! Control loop execution.
//!
//! This module provides the core cycle logic, including:
//! - Policy trait implemented by every control policy
//! - ControlLoop binding a policy to its spec, retry controller, and audit logger
//! - Scheduled and manual entry points sharing one cycle lock

mod control_loop;
mod policy;

pub use control_loop::{ControlLoop, LoopStatus};
pub use policy::{EvalContext, Policy};
