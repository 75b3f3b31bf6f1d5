//! Project configuration (`tfstack.json`).
//!
//! Every field is optional. Environment variables override the file and
//! command-line flags override both (applied by the CLI).

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::CONFIG_FILENAME;
use crate::get::Language;

pub const ENV_OUTPUT: &str = "TFSTACK_OUTPUT";
pub const ENV_TERRAFORM_BINARY: &str = "TFSTACK_TERRAFORM_BINARY";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid configuration in {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
  /// App document to synthesize.
  pub app: PathBuf,
  /// Directory receiving manifests and the provider artifact.
  pub output: PathBuf,
  pub language: Language,
  /// Directory receiving generated bindings.
  pub codegen_output: PathBuf,
  /// Generator command line; `--language` and `--output` are appended.
  pub codegen_command: Option<Vec<String>>,
  pub terraform_binary: PathBuf,
  /// Arguments placed before every terraform subcommand.
  pub terraform_args: Vec<String>,
  pub skip_init: bool,
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      app: PathBuf::from("app.json"),
      output: PathBuf::from("tfstack.out"),
      language: Language::default(),
      codegen_output: PathBuf::from(".gen"),
      codegen_command: None,
      terraform_binary: PathBuf::from("terraform"),
      terraform_args: Vec::new(),
      skip_init: false,
    }
  }
}

impl ProjectConfig {
  /// Load `tfstack.json` from `dir`, then apply environment overrides.
  ///
  /// A missing file yields the defaults.
  pub fn load(dir: &Path) -> Result<Self, ConfigError> {
    let mut config = Self::from_file(&dir.join(CONFIG_FILENAME))?;
    config.apply_env();
    Ok(config)
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no project config, using defaults");
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  fn apply_env(&mut self) {
    if let Some(output) = env_path(ENV_OUTPUT) {
      debug!(output = %output.display(), "output overridden from environment");
      self.output = output;
    }
    if let Some(binary) = env_path(ENV_TERRAFORM_BINARY) {
      self.terraform_binary = binary;
    }
  }

  /// Resolve relative paths against `base`.
  pub fn resolve(mut self, base: &Path) -> Self {
    for path in [&mut self.app, &mut self.output, &mut self.codegen_output] {
      if path.is_relative() {
        *path = base.join(&*path);
      }
    }
    self
  }
}

fn env_path(name: &str) -> Option<PathBuf> {
  std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from)
}
