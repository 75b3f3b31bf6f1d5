//! Parsing of the engine's machine-readable plan output.
//!
//! The input is the JSON document printed by `terraform show -json <plan>`.
//! Each entry of `resource_changes` becomes exactly one [`PlannedResource`];
//! nothing is dropped, so the action counts always partition the full list.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{PlannedResource, PlannedResourceAction};

/// Marker line printed by remote backends ahead of the run URL.
const REMOTE_RUN_MARKER: &str = "To view this run in a browser, visit:";

#[derive(Debug, Error)]
pub enum PlanParseError {
  #[error("plan output is not valid JSON: {0}")]
  InvalidJson(#[from] serde_json::Error),

  #[error("resource {address} has no planned actions")]
  NoActions { address: String },

  #[error("resource {address} has unrecognized actions {actions:?}")]
  UnknownAction { address: String, actions: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct ShowOutput {
  #[serde(default)]
  resource_changes: Vec<ResourceChange>,
}

#[derive(Debug, Deserialize)]
struct ResourceChange {
  address: String,
  change: Change,
}

#[derive(Debug, Deserialize)]
struct Change {
  #[serde(default)]
  actions: Vec<String>,
}

/// Parse `terraform show -json` output into planned resources.
pub fn parse_plan_json(content: &str) -> Result<Vec<PlannedResource>, PlanParseError> {
  let output: ShowOutput = serde_json::from_str(content)?;

  output
    .resource_changes
    .into_iter()
    .map(|rc| {
      let action = classify_actions(&rc.address, &rc.change.actions)?;
      Ok(PlannedResource::new(rc.address, action))
    })
    .collect()
}

/// Map the engine's action list onto the four planned actions.
///
/// Replacements (`delete` + `create` in either order) are classified as
/// updates and data source reads as no-ops; both are logged. Anything else
/// outside the engine vocabulary is an error.
pub fn classify_actions(address: &str, actions: &[String]) -> Result<PlannedResourceAction, PlanParseError> {
  let actions_str: Vec<&str> = actions.iter().map(String::as_str).collect();

  let action = match actions_str.as_slice() {
    [] => {
      return Err(PlanParseError::NoActions {
        address: address.to_string(),
      });
    }
    ["create"] => PlannedResourceAction::Create,
    ["update"] => PlannedResourceAction::Update,
    ["delete"] => PlannedResourceAction::Delete,
    ["no-op"] => PlannedResourceAction::NoOp,
    ["read"] => {
      debug!(address, "data source read classified as no-op");
      PlannedResourceAction::NoOp
    }
    ["delete", "create"] | ["create", "delete"] => {
      warn!(address, "resource will be replaced, classified as update");
      PlannedResourceAction::Update
    }
    _ => {
      return Err(PlanParseError::UnknownAction {
        address: address.to_string(),
        actions: actions.to_vec(),
      });
    }
  };

  Ok(action)
}

/// Extract the remote run URL from human-readable plan output, if present.
pub fn parse_remote_url(output: &str) -> Option<String> {
  let mut lines = output.lines();
  while let Some(line) = lines.next() {
    if let Some(pos) = line.find(REMOTE_RUN_MARKER) {
      let rest = &line[pos + REMOTE_RUN_MARKER.len()..];
      return std::iter::once(rest)
        .chain(lines)
        .flat_map(str::split_whitespace)
        .find(|token| token.starts_with("https://") || token.starts_with("http://"))
        .map(str::to_string);
    }
  }
  None
}
