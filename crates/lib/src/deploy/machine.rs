//! The deploy state machine.
//!
//! ```text
//! Starting → Planning → Planned → Applying → Done
//!     └──────────┴──────────┴──────────┴─────→ Errored
//! ```
//!
//! Every transition replaces the whole [`DeployState`] inside a
//! `tokio::sync::watch` channel, so readers always see a consistent snapshot
//! and subscribers wake on each change.

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::engine::{ResourceApplyEvent, ResourceApplyState};
use crate::plan::PlanSummary;

use super::state::{DeployFailure, DeployState, ResourceProgress, Status};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
  #[error("deploy already finished with status {0}")]
  Terminal(Status),

  #[error("cannot {action} while {from}")]
  InvalidTransition { from: Status, action: &'static str },

  #[error("plan contains no changes to apply")]
  NothingToApply,

  #[error("resource {0} is not part of the applied plan")]
  UnknownResource(String),
}

/// Owns the deploy state of one stack.
#[derive(Debug)]
pub struct DeployMachine {
  tx: watch::Sender<DeployState>,
}

impl Default for DeployMachine {
  fn default() -> Self {
    Self::new()
  }
}

impl DeployMachine {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(DeployState::default());
    Self { tx }
  }

  /// Owned snapshot of the current state.
  pub fn state(&self) -> DeployState {
    self.tx.borrow().clone()
  }

  /// Receiver observing every state replacement.
  pub fn subscribe(&self) -> watch::Receiver<DeployState> {
    self.tx.subscribe()
  }

  pub fn status(&self) -> Status {
    self.tx.borrow().status
  }

  pub fn start_planning(&self, stack_name: &str) -> Result<(), TransitionError> {
    self.transition(|next| {
      check(next, Status::Starting, "start planning")?;
      next.status = Status::Planning;
      next.stack_name = Some(stack_name.to_string());
      debug!(stack = %stack_name, "planning");
      Ok(true)
    })
  }

  /// Store the plan. Counts are computed here and never again.
  pub fn planned(&self, summary: PlanSummary) -> Result<(), TransitionError> {
    self.transition(|next| {
      check(next, Status::Planning, "accept a plan")?;
      let counts = summary.counts();
      next.status = Status::Planned;
      next.counts = Some(counts);
      next.url = summary.url.clone();
      next.plan = Some(summary);
      info!(
        create = counts.create,
        update = counts.update,
        delete = counts.delete,
        noop = counts.noop,
        "planned"
      );
      Ok(true)
    })
  }

  /// Begin applying. Seeds one pending entry per resource that changes.
  pub fn start_applying(&self) -> Result<(), TransitionError> {
    self.transition(|next| {
      check(next, Status::Planned, "start applying")?;
      let plan = next.plan.as_ref().ok_or(TransitionError::InvalidTransition {
        from: Status::Planned,
        action: "start applying without a plan",
      })?;
      if !plan.needs_apply() {
        return Err(TransitionError::NothingToApply);
      }

      next.resources = plan
        .applyable_resources()
        .map(|r| ResourceProgress {
          id: r.id.clone(),
          action: r.action,
          state: ResourceApplyState::Pending,
        })
        .collect();
      next.status = Status::Applying;
      debug!(pending = next.resources.len(), "applying");
      Ok(true)
    })
  }

  /// Record a resource outcome.
  ///
  /// Moves to Done once every entry is terminal, even if some failed. Events
  /// for resources outside the plan are rejected without touching the state.
  pub fn record(&self, event: ResourceApplyEvent) -> Result<(), TransitionError> {
    self.transition(|next| {
      check(next, Status::Applying, "record a resource outcome")?;
      let Some(entry) = next.resources.iter_mut().find(|r| r.id == event.id) else {
        warn!(resource = %event.id, "outcome for a resource outside the plan");
        return Err(TransitionError::UnknownResource(event.id));
      };

      if entry.state.is_terminal() {
        debug!(resource = %event.id, "ignoring outcome for a finished resource");
        return Ok(false);
      }
      if let ResourceApplyState::Failed { message } = &event.state {
        warn!(resource = %event.id, message = %message, "resource failed");
      }
      entry.state = event.state;

      if next.all_terminal() {
        next.status = Status::Done;
        info!(failed = next.failed_resources().count(), "apply finished");
      }
      Ok(true)
    })
  }

  /// Finish without applying: diff mode, or a plan with nothing to change.
  pub fn complete(&self) -> Result<(), TransitionError> {
    self.transition(|next| {
      check(next, Status::Planned, "complete")?;
      next.status = Status::Done;
      Ok(true)
    })
  }

  /// Enter Errored from any non-terminal state.
  pub fn fail(&self, failure: DeployFailure) -> Result<(), TransitionError> {
    self.transition(|next| {
      if next.status.is_terminal() {
        return Err(TransitionError::Terminal(next.status));
      }
      warn!(kind = ?failure.kind, message = %failure.message, from = %next.status, "deploy failed");
      next.status = Status::Errored;
      next.error = Some(failure);
      Ok(true)
    })
  }

  /// Check and mutate under the channel's write lock, so a transition never
  /// acts on a stale state. `apply` works on a copy that is committed only
  /// when it returns `Ok(true)`; subscribers are notified only then.
  fn transition<F>(&self, apply: F) -> Result<(), TransitionError>
  where
    F: FnOnce(&mut DeployState) -> Result<bool, TransitionError>,
  {
    let mut result = Ok(());
    self.tx.send_if_modified(|state| {
      let mut next = state.clone();
      match apply(&mut next) {
        Ok(true) => {
          *state = next;
          true
        }
        Ok(false) => false,
        Err(e) => {
          result = Err(e);
          false
        }
      }
    });
    result
  }
}

/// Ensure `state` is in `from`, otherwise report why not.
fn check(state: &DeployState, from: Status, action: &'static str) -> Result<(), TransitionError> {
  if state.status.is_terminal() {
    return Err(TransitionError::Terminal(state.status));
  }
  if state.status != from {
    return Err(TransitionError::InvalidTransition {
      from: state.status,
      action,
    });
  }
  Ok(())
}
