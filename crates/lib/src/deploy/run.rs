//! Drives one stack through plan and apply.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{CancelToken, EngineError, ExecutionEngine};
use crate::synth::{SynthError, SynthOutput};

use super::machine::{DeployMachine, TransitionError};
use super::state::{DeployFailure, DeployState, ErrorKind, Status};

/// Whether to stop after planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
  Diff,
  Deploy,
}

#[derive(Debug, Error)]
pub enum DeployError {
  #[error("manifest {0} not found, synthesize the stack first")]
  MissingManifest(PathBuf),

  #[error(transparent)]
  Synth(#[from] SynthError),

  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error("deploy cancelled")]
  Cancelled,

  #[error("apply finished without an outcome for {}", .0.join(", "))]
  MissingOutcome(Vec<String>),

  #[error(transparent)]
  Transition(#[from] TransitionError),
}

impl DeployError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      DeployError::MissingManifest(_) | DeployError::Synth(_) => ErrorKind::SynthesisIo,
      DeployError::Engine(EngineError::PlanParse(_)) => ErrorKind::PlanParse,
      DeployError::Engine(_) | DeployError::MissingOutcome(_) | DeployError::Transition(_) => {
        ErrorKind::ExternalEngine
      }
      DeployError::Cancelled => ErrorKind::Cancelled,
    }
  }
}

impl From<&DeployError> for DeployFailure {
  fn from(err: &DeployError) -> Self {
    DeployFailure::new(err.kind(), err.to_string())
  }
}

/// Plan, and in deploy mode apply, one synthesized stack.
///
/// Always leaves `machine` in Done or Errored and returns the final snapshot.
/// When `cancel` fires the in-flight engine future is dropped and the machine
/// enters Errored with a cancellation failure.
pub async fn run_stack<E: ExecutionEngine>(
  engine: &E,
  machine: &DeployMachine,
  stack: &SynthOutput,
  mode: DeployMode,
  cancel: &CancelToken,
) -> DeployState {
  let state = plan_stack(engine, machine, stack, cancel).await;
  if state.status != Status::Planned {
    return state;
  }
  match mode {
    DeployMode::Diff => finish_without_apply(machine),
    DeployMode::Deploy => apply_stack(engine, machine, cancel).await,
  }
}

/// Run the engine's plan and leave the machine in Planned, or Errored.
pub async fn plan_stack<E: ExecutionEngine>(
  engine: &E,
  machine: &DeployMachine,
  stack: &SynthOutput,
  cancel: &CancelToken,
) -> DeployState {
  let result = plan_inner(engine, machine, stack, cancel).await;
  settle(machine, result)
}

/// Apply the stored plan. A plan without changes completes immediately.
pub async fn apply_stack<E: ExecutionEngine>(engine: &E, machine: &DeployMachine, cancel: &CancelToken) -> DeployState {
  let result = apply_inner(engine, machine, cancel).await;
  settle(machine, result)
}

/// Move a planned deploy to Done without applying.
pub fn finish_without_apply(machine: &DeployMachine) -> DeployState {
  let result = machine.complete().map_err(DeployError::from);
  settle(machine, result)
}

/// Record that `stack_name` could not be synthesized.
///
/// The machine passes through Planning so the Errored snapshot names its
/// stack, then fails with a synthesis failure.
pub fn synthesis_failed(machine: &DeployMachine, stack_name: &str, err: SynthError) -> DeployState {
  let err = match machine.start_planning(stack_name) {
    Ok(()) => DeployError::Synth(err),
    Err(e) => e.into(),
  };
  settle(machine, Err(err))
}

fn settle(machine: &DeployMachine, result: Result<(), DeployError>) -> DeployState {
  if let Err(err) = result {
    if let Err(e) = machine.fail(DeployFailure::from(&err)) {
      debug!(error = %e, "deploy already finished");
    }
  }
  let state = machine.state();
  if state.status.is_terminal() {
    info!(stack = state.stack_name.as_deref().unwrap_or_default(), status = %state.status, "deploy finished");
  }
  state
}

async fn plan_inner<E: ExecutionEngine>(
  engine: &E,
  machine: &DeployMachine,
  stack: &SynthOutput,
  cancel: &CancelToken,
) -> Result<(), DeployError> {
  machine.start_planning(&stack.stack_name)?;
  if !stack.manifest_path.is_file() {
    return Err(DeployError::MissingManifest(stack.manifest_path.clone()));
  }

  let summary = tokio::select! {
    biased;
    _ = cancel.cancelled() => return Err(DeployError::Cancelled),
    result = engine.plan(stack) => result?,
  };
  machine.planned(summary)?;
  Ok(())
}

async fn apply_inner<E: ExecutionEngine>(
  engine: &E,
  machine: &DeployMachine,
  cancel: &CancelToken,
) -> Result<(), DeployError> {
  let Some(plan) = machine.state().plan else {
    return Err(TransitionError::InvalidTransition {
      from: machine.status(),
      action: "apply without a plan",
    }
    .into());
  };
  if !plan.needs_apply() {
    machine.complete()?;
    return Ok(());
  }

  machine.start_applying()?;
  let (tx, mut rx) = mpsc::unbounded_channel();
  let apply = engine.apply(&plan, tx);
  tokio::pin!(apply);

  let mut apply_done = false;
  let mut events_done = false;
  while !(apply_done && events_done) {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(DeployError::Cancelled),
      result = &mut apply, if !apply_done => {
        result?;
        apply_done = true;
      }
      event = rx.recv(), if !events_done => match event {
        Some(event) => match machine.record(event) {
          Ok(()) | Err(TransitionError::UnknownResource(_)) => {}
          Err(TransitionError::Terminal(status)) => debug!(%status, "outcome after deploy finished"),
          Err(e) => return Err(e.into()),
        },
        None => events_done = true,
      },
    }
  }

  let state = machine.state();
  if state.status == Status::Applying {
    let missing: Vec<String> = state
      .resources
      .iter()
      .filter(|r| !r.state.is_terminal())
      .map(|r| r.id.clone())
      .collect();
    warn!(count = missing.len(), "engine finished without reporting every resource");
    return Err(DeployError::MissingOutcome(missing));
  }
  Ok(())
}
