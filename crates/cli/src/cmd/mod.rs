mod deploy;
mod diff;
mod get;
mod synth;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use tfstack_lib::config::ProjectConfig;
use tfstack_lib::engine::{CancelToken, TerraformEngine, cancel_pair};
use tfstack_lib::node::{App, Stack};
use tfstack_lib::synth::{SynthError, SynthOutput, synthesize};

pub use deploy::cmd_deploy;
pub use diff::cmd_diff;
pub use get::cmd_get;
pub use synth::cmd_synth;

/// Flags shared by commands that read the app document.
#[derive(Debug, Clone, Default, Args)]
pub struct ProjectArgs {
  /// App document (default from tfstack.json, else app.json)
  #[arg(short, long)]
  pub app: Option<PathBuf>,

  /// Output directory for synthesized manifests
  #[arg(short, long)]
  pub output: Option<PathBuf>,

  /// Only process the named stack
  #[arg(short, long)]
  pub stack: Option<String>,
}

/// Configuration and app document of the project being operated on.
pub struct Project {
  pub config: ProjectConfig,
  pub app: App,
  pub stack: Option<String>,
}

impl Project {
  /// Load `tfstack.json` from `dir`, apply flag overrides and read the app.
  pub fn load(dir: &Path, args: &ProjectArgs) -> Result<Self> {
    let mut config = ProjectConfig::load(dir).context("Failed to load project configuration")?;
    if let Some(app) = &args.app {
      config.app = app.clone();
    }
    if let Some(output) = &args.output {
      config.output = output.clone();
    }
    let config = config.resolve(dir);
    debug!(app = %config.app.display(), output = %config.output.display(), "project loaded");

    let content = std::fs::read_to_string(&config.app)
      .with_context(|| format!("Failed to read app document: {}", config.app.display()))?;
    let app = App::from_json(&content).with_context(|| format!("Invalid app document: {}", config.app.display()))?;
    app.validate().context("Invalid configuration tree")?;

    Ok(Self {
      config,
      app,
      stack: args.stack.clone(),
    })
  }

  /// Stacks selected by `--stack`, or all of them.
  pub fn stacks(&self) -> Result<Vec<&Stack>> {
    match &self.stack {
      Some(name) => Ok(vec![self.app.stack(name)?]),
      None => Ok(self.app.stacks.iter().collect()),
    }
  }

  /// Synthesize the selected stacks into the output directory.
  pub fn synthesize(&self) -> Result<Vec<SynthOutput>> {
    self
      .stacks()?
      .into_iter()
      .map(|stack| {
        self
          .synthesize_stack(stack)
          .with_context(|| format!("Failed to synthesize stack '{}'", stack.name))
      })
      .collect()
  }

  /// Synthesize one stack, leaving error handling to the caller.
  pub fn synthesize_stack(&self, stack: &Stack) -> Result<SynthOutput, SynthError> {
    synthesize(stack, &self.config.output)
  }

  pub fn engine(&self) -> TerraformEngine {
    TerraformEngine::new(&self.config.terraform_binary)
      .with_prefix_args(self.config.terraform_args.clone())
      .with_skip_init(self.config.skip_init)
  }
}

/// Build a runtime and a token cancelled by Ctrl-C.
pub fn runtime_with_interrupt() -> Result<(tokio::runtime::Runtime, CancelToken)> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let (handle, token) = cancel_pair();
  rt.spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      handle.cancel();
    }
  });
  Ok((rt, token))
}
