//! Planned resource and plan summary types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::node::strip_hash_suffix;

/// What the engine intends to do with one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlannedResourceAction {
  Create,
  Update,
  Delete,
  NoOp,
}

impl PlannedResourceAction {
  /// Returns true unless the action is a no-op.
  pub fn is_applyable(self) -> bool {
    !matches!(self, PlannedResourceAction::NoOp)
  }
}

impl fmt::Display for PlannedResourceAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      PlannedResourceAction::Create => "create",
      PlannedResourceAction::Update => "update",
      PlannedResourceAction::Delete => "delete",
      PlannedResourceAction::NoOp => "no-op",
    };
    f.write_str(s)
  }
}

/// One resource in a plan, identified by its engine address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedResource {
  /// Engine-qualified address, e.g. `null_resource.hellodiff_test_15E428D2`.
  pub id: String,
  pub action: PlannedResourceAction,
}

impl PlannedResource {
  pub fn new(id: impl Into<String>, action: PlannedResourceAction) -> Self {
    Self { id: id.into(), action }
  }

  /// The address without `module.<name>.` prefixes.
  fn local_address(&self) -> &str {
    let mut rest = self.id.as_str();
    while let Some(stripped) = rest.strip_prefix("module.") {
      match stripped.split_once('.') {
        Some((_, tail)) => rest = tail,
        None => break,
      }
    }
    rest
  }

  /// Resource type portion of the address (`null_resource`, `data.http`).
  pub fn resource_type(&self) -> &str {
    match self.local_address().rsplit_once('.') {
      Some((kind, _)) => kind,
      None => "",
    }
  }

  /// Logical name portion of the address, including any index suffix.
  pub fn name(&self) -> &str {
    let local = self.local_address();
    match local.rsplit_once('.') {
      Some((_, name)) => name,
      None => local,
    }
  }

  /// Logical name without the unique-id hash suffix.
  pub fn display_name(&self) -> &str {
    strip_hash_suffix(self.name())
  }
}

/// Number of resources per action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
  pub create: usize,
  pub update: usize,
  pub delete: usize,
  pub noop: usize,
}

impl ActionCounts {
  pub fn from_resources(resources: &[PlannedResource]) -> Self {
    let mut counts = ActionCounts::default();
    for resource in resources {
      match resource.action {
        PlannedResourceAction::Create => counts.create += 1,
        PlannedResourceAction::Update => counts.update += 1,
        PlannedResourceAction::Delete => counts.delete += 1,
        PlannedResourceAction::NoOp => counts.noop += 1,
      }
    }
    counts
  }

  pub fn total(&self) -> usize {
    self.create + self.update + self.delete + self.noop
  }
}

/// Result of planning one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
  /// Every resource reported by the engine, in engine order.
  pub resources: Vec<PlannedResource>,
  /// The on-disk plan artifact to hand to apply.
  pub plan_file: PathBuf,
  /// Browser URL when the plan runs on a remote backend.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
}

impl PlanSummary {
  pub fn new(resources: Vec<PlannedResource>, plan_file: impl Into<PathBuf>) -> Self {
    Self {
      resources,
      plan_file: plan_file.into(),
      url: None,
    }
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.url = Some(url.into());
    self
  }

  /// True iff any resource has a non-no-op action.
  pub fn needs_apply(&self) -> bool {
    self.resources.iter().any(|r| r.action.is_applyable())
  }

  /// Resources with a non-no-op action.
  pub fn applyable_resources(&self) -> impl Iterator<Item = &PlannedResource> {
    self.resources.iter().filter(|r| r.action.is_applyable())
  }

  pub fn counts(&self) -> ActionCounts {
    ActionCounts::from_resources(&self.resources)
  }

  pub fn find(&self, id: &str) -> Option<&PlannedResource> {
    self.resources.iter().find(|r| r.id == id)
  }
}
