//! Plan/diff/apply lifecycle of a stack.
//!
//! [`DeployMachine`] holds the state; [`run_stack`] drives an
//! [`ExecutionEngine`](crate::engine::ExecutionEngine) and feeds the machine.
//! Renderers read [`DeployState`] snapshots or subscribe to changes.

mod machine;
mod run;
mod state;

pub use machine::{DeployMachine, TransitionError};
pub use run::{DeployError, DeployMode, apply_stack, finish_without_apply, plan_stack, run_stack, synthesis_failed};
pub use state::{DeployFailure, DeployState, ErrorKind, ResourceProgress, Status};
