//! Deploy snapshot types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::ResourceApplyState;
use crate::plan::{ActionCounts, PlanSummary, PlannedResourceAction};

/// Phase of a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  #[default]
  Starting,
  Planning,
  Planned,
  Applying,
  Done,
  Errored,
}

impl Status {
  pub fn is_terminal(self) -> bool {
    matches!(self, Status::Done | Status::Errored)
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Status::Starting => "starting",
      Status::Planning => "planning",
      Status::Planned => "planned",
      Status::Applying => "applying",
      Status::Done => "done",
      Status::Errored => "errored",
    };
    f.write_str(s)
  }
}

/// Category of a deploy failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  SynthesisIo,
  ExternalEngine,
  PlanParse,
  Cancelled,
}

/// Failure stored in an errored snapshot. `message` is verbatim, including
/// any diagnostic text from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployFailure {
  pub kind: ErrorKind,
  pub message: String,
}

impl DeployFailure {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }

  pub fn cancelled() -> Self {
    Self::new(ErrorKind::Cancelled, "deploy cancelled")
  }
}

impl fmt::Display for DeployFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

/// Apply progress of one planned resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProgress {
  pub id: String,
  pub action: PlannedResourceAction,
  #[serde(flatten)]
  pub state: ResourceApplyState,
}

/// Everything a renderer needs at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployState {
  pub status: Status,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stack_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub plan: Option<PlanSummary>,
  /// Set once when the plan arrives.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub counts: Option<ActionCounts>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub resources: Vec<ResourceProgress>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<DeployFailure>,
}

impl DeployState {
  pub fn progress(&self, id: &str) -> Option<&ResourceProgress> {
    self.resources.iter().find(|r| r.id == id)
  }

  /// True when every tracked resource reached Succeeded or Failed.
  pub fn all_terminal(&self) -> bool {
    self.resources.iter().all(|r| r.state.is_terminal())
  }

  pub fn failed_resources(&self) -> impl Iterator<Item = &ResourceProgress> {
    self
      .resources
      .iter()
      .filter(|r| matches!(r.state, ResourceApplyState::Failed { .. }))
  }
}
