//! Synthesis result and error types.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::node::NodeError;

use super::lock::ProviderLockError;

/// Artifacts written for one stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthOutput {
  /// Name of the synthesized stack.
  pub stack_name: String,
  /// Unique id of the stack, the stem of its manifest file name.
  pub stack_id: String,
  /// Per-stack manifest artifact.
  pub manifest_path: PathBuf,
  /// Provider artifact shared by every stack in the output directory.
  pub provider_path: PathBuf,
  /// The manifest document that was written.
  #[serde(skip)]
  pub manifest: Value,
}

impl SynthOutput {
  /// Directory holding the artifacts.
  pub fn out_dir(&self) -> &Path {
    self.manifest_path.parent().unwrap_or_else(|| Path::new("."))
  }
}

/// Errors that can occur during synthesis.
#[derive(Debug, Error)]
pub enum SynthError {
  /// The tree violates a structural invariant.
  #[error("invalid configuration tree: {0}")]
  Node(#[from] NodeError),

  #[error("failed to create output directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// An existing provider artifact is not valid JSON.
  #[error("failed to parse existing {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize document: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("provider lock error: {0}")]
  Lock(#[from] ProviderLockError),
}
