//! Boundary to the external execution engine.
//!
//! An [`ExecutionEngine`] turns a synthesized stack into a [`PlanSummary`] and
//! applies a plan while streaming per-resource outcomes. [`TerraformEngine`]
//! drives the `terraform` binary as a subprocess.

mod cancel;
mod terraform;

use std::future::Future;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::plan::{PlanParseError, PlanSummary};
use crate::synth::SynthOutput;

pub use cancel::{CancelHandle, CancelToken, cancel_pair};
pub use terraform::{ApplyMessage, TerraformEngine, parse_apply_message};

/// Progress of a single resource during apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResourceApplyState {
  Pending,
  Applying,
  Succeeded,
  Failed { message: String },
}

impl ResourceApplyState {
  /// Succeeded and Failed are terminal.
  pub fn is_terminal(&self) -> bool {
    matches!(self, ResourceApplyState::Succeeded | ResourceApplyState::Failed { .. })
  }
}

/// A state change reported by the engine for one resource address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceApplyEvent {
  pub id: String,
  pub state: ResourceApplyState,
}

impl ResourceApplyEvent {
  pub fn new(id: impl Into<String>, state: ResourceApplyState) -> Self {
    Self { id: id.into(), state }
  }
}

/// Errors raised at the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("failed to start {program}: {source}")]
  Spawn {
    program: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The engine exited unsuccessfully; `stderr` is its own diagnostic text.
  #[error("`{command}` exited with code {code:?}:\n{stderr}")]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("malformed engine output: {0}")]
  MalformedOutput(String),

  #[error(transparent)]
  PlanParse(#[from] PlanParseError),

  #[error("engine io error: {0}")]
  Io(#[from] io::Error),
}

/// The external engine that plans and applies synthesized stacks.
///
/// Both operations are suspension points. Dropping an in-flight future must
/// stop the underlying engine work.
pub trait ExecutionEngine {
  /// Produce a plan for a synthesized stack.
  fn plan(&self, stack: &SynthOutput) -> impl Future<Output = Result<PlanSummary, EngineError>>;

  /// Apply a plan, sending one event per resource state change.
  ///
  /// A successful return means the engine finished; per-resource failures are
  /// reported as events, not as an error.
  fn apply(
    &self,
    plan: &PlanSummary,
    events: mpsc::UnboundedSender<ResourceApplyEvent>,
  ) -> impl Future<Output = Result<(), EngineError>>;
}
