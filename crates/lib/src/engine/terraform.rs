//! Terraform subprocess engine.
//!
//! Each stack gets its own working directory so stacks sharing one output
//! directory never see each other's manifests:
//!
//! ```text
//! {out_dir}/stacks/<stack id>/
//! ├── <stack id>.tf.json
//! ├── providers.tf.json
//! └── plan
//! ```
//!
//! Every child process is spawned with `kill_on_drop`, so cancelling a plan or
//! apply by dropping its future also terminates the engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::consts::{PLAN_FILENAME, PROVIDER_FILENAME, STACKS_DIR};
use crate::plan::{PlanSummary, parse_plan_json, parse_remote_url};
use crate::synth::SynthOutput;

use super::{EngineError, ExecutionEngine, ResourceApplyEvent, ResourceApplyState};

/// Runs the `terraform` CLI.
#[derive(Debug, Clone)]
pub struct TerraformEngine {
  program: PathBuf,
  prefix_args: Vec<String>,
  skip_init: bool,
}

impl Default for TerraformEngine {
  fn default() -> Self {
    Self::new("terraform")
  }
}

impl TerraformEngine {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      prefix_args: Vec::new(),
      skip_init: false,
    }
  }

  /// Arguments placed before every engine subcommand, for wrappers such as
  /// version managers (`tfenv exec`).
  pub fn with_prefix_args(mut self, args: Vec<String>) -> Self {
    self.prefix_args = args;
    self
  }

  /// Skip `terraform init` before planning.
  pub fn with_skip_init(mut self, skip_init: bool) -> Self {
    self.skip_init = skip_init;
    self
  }

  /// Working directory used for a stack.
  pub fn workdir(stack: &SynthOutput) -> PathBuf {
    stack.out_dir().join(STACKS_DIR).join(&stack.stack_id)
  }

  /// Copy the stack's artifacts into its working directory.
  fn prepare_workdir(&self, stack: &SynthOutput) -> Result<PathBuf, EngineError> {
    let workdir = Self::workdir(stack);
    std::fs::create_dir_all(&workdir)?;

    let manifest_name = stack
      .manifest_path
      .file_name()
      .ok_or_else(|| EngineError::MalformedOutput(format!("invalid manifest path {}", stack.manifest_path.display())))?;
    std::fs::copy(&stack.manifest_path, workdir.join(manifest_name))?;
    if stack.provider_path.exists() {
      std::fs::copy(&stack.provider_path, workdir.join(PROVIDER_FILENAME))?;
    }

    debug!(stack = %stack.stack_name, workdir = %workdir.display(), "prepared engine working directory");
    Ok(workdir)
  }

  fn command(&self, workdir: &Path, args: &[&str]) -> (Command, String) {
    let mut command = Command::new(&self.program);
    command
      .args(&self.prefix_args)
      .args(args)
      .current_dir(workdir)
      .env("TF_IN_AUTOMATION", "1")
      .stdin(Stdio::null())
      .kill_on_drop(true);
    let line = format!("{} {}", self.program.display(), args.join(" "));
    (command, line)
  }

  /// Run a subcommand to completion and return its stdout.
  async fn run(&self, workdir: &Path, args: &[&str]) -> Result<String, EngineError> {
    let (mut command, line) = self.command(workdir, args);
    info!(command = %line, "running engine");

    let output = command.output().await.map_err(|source| EngineError::Spawn {
      program: self.program.clone(),
      source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
      debug!(stdout = %stdout, "engine stdout");
      return Err(EngineError::Failed {
        command: line,
        code: output.status.code(),
        stderr,
      });
    }
    Ok(stdout)
  }
}

impl ExecutionEngine for TerraformEngine {
  async fn plan(&self, stack: &SynthOutput) -> Result<PlanSummary, EngineError> {
    let workdir = self.prepare_workdir(stack)?;

    if !self.skip_init {
      self.run(&workdir, &["init", "-input=false", "-no-color"]).await?;
    }

    let plan_arg = format!("-out={}", PLAN_FILENAME);
    let plan_output = self
      .run(&workdir, &["plan", "-input=false", "-no-color", &plan_arg])
      .await?;
    let url = parse_remote_url(&plan_output);

    let show_output = self.run(&workdir, &["show", "-json", PLAN_FILENAME]).await?;
    let resources = parse_plan_json(&show_output)?;

    info!(stack = %stack.stack_name, resources = resources.len(), "plan complete");

    let mut summary = PlanSummary::new(resources, workdir.join(PLAN_FILENAME));
    summary.url = url;
    Ok(summary)
  }

  async fn apply(
    &self,
    plan: &PlanSummary,
    events: mpsc::UnboundedSender<ResourceApplyEvent>,
  ) -> Result<(), EngineError> {
    let workdir = plan
      .plan_file
      .parent()
      .map(Path::to_path_buf)
      .ok_or_else(|| EngineError::MalformedOutput(format!("invalid plan file {}", plan.plan_file.display())))?;
    let plan_name = plan
      .plan_file
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| PLAN_FILENAME.to_string());

    let (mut command, line) = self.command(&workdir, &["apply", "-auto-approve", "-input=false", "-json", &plan_name]);
    info!(command = %line, "running engine");

    let mut child = command
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|source| EngineError::Spawn {
        program: self.program.clone(),
        source,
      })?;

    let stdout = child
      .stdout
      .take()
      .ok_or_else(|| EngineError::MalformedOutput("engine stdout unavailable".to_string()))?;
    let mut stderr = child
      .stderr
      .take()
      .ok_or_else(|| EngineError::MalformedOutput("engine stderr unavailable".to_string()))?;

    let mut tracker = ApplyTracker::default();
    let read_stdout = async {
      let mut lines = BufReader::new(stdout).lines();
      while let Some(line) = lines.next_line().await? {
        for event in tracker.observe(&line) {
          let _ = events.send(event);
        }
      }
      Ok::<(), std::io::Error>(())
    };
    let read_stderr = async {
      let mut buf = String::new();
      stderr.read_to_string(&mut buf).await?;
      Ok::<String, std::io::Error>(buf)
    };

    let ((), stderr_text) = tokio::try_join!(read_stdout, read_stderr)?;
    let status = child.wait().await?;

    for event in tracker.finish() {
      let _ = events.send(event);
    }

    if !status.success() && tracker.failed == 0 {
      return Err(EngineError::Failed {
        command: line,
        code: status.code(),
        stderr: tracker.engine_output(&stderr_text),
      });
    }
    if !status.success() {
      warn!(failed = tracker.failed, "apply finished with resource failures");
    }
    Ok(())
  }
}

/// A machine-readable line of `terraform apply -json` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMessage {
  Started { address: String },
  Completed { address: String },
  Errored { address: String },
  Diagnostic {
    address: Option<String>,
    summary: String,
    detail: String,
  },
}

#[derive(Debug, Deserialize)]
struct RawMessage {
  #[serde(rename = "type")]
  kind: String,
  #[serde(default)]
  hook: Option<RawHook>,
  #[serde(default)]
  diagnostic: Option<RawDiagnostic>,
}

#[derive(Debug, Deserialize)]
struct RawHook {
  resource: RawResource,
}

#[derive(Debug, Deserialize)]
struct RawResource {
  addr: String,
}

#[derive(Debug, Deserialize)]
struct RawDiagnostic {
  severity: String,
  #[serde(default)]
  summary: String,
  #[serde(default)]
  detail: String,
  #[serde(default)]
  address: Option<String>,
}

/// Parse one line of apply output. Lines that carry no resource progress
/// (version banners, outputs, change summaries) yield `None`.
pub fn parse_apply_message(line: &str) -> Option<ApplyMessage> {
  let raw: RawMessage = serde_json::from_str(line).ok()?;
  let address = raw.hook.map(|h| h.resource.addr);

  match raw.kind.as_str() {
    "apply_start" => address.map(|address| ApplyMessage::Started { address }),
    "apply_complete" => address.map(|address| ApplyMessage::Completed { address }),
    "apply_errored" => address.map(|address| ApplyMessage::Errored { address }),
    "diagnostic" => {
      let diagnostic = raw.diagnostic?;
      if diagnostic.severity != "error" {
        return None;
      }
      Some(ApplyMessage::Diagnostic {
        address: diagnostic.address,
        summary: diagnostic.summary,
        detail: diagnostic.detail,
      })
    }
    _ => None,
  }
}

/// Turns apply messages into resource events.
///
/// `apply_errored` carries no reason; the matching error diagnostic follows
/// it, so failures are held back until their diagnostic arrives or the stream
/// ends.
///
/// Error diagnostics without a resource address (provider or backend
/// configuration errors) are kept so they can be reported with the failure,
/// since stderr stays empty in JSON mode.
#[derive(Debug, Default)]
struct ApplyTracker {
  errored: BTreeMap<String, Option<String>>,
  diagnostics: Vec<String>,
  failed: usize,
}

impl ApplyTracker {
  fn observe(&mut self, line: &str) -> Vec<ResourceApplyEvent> {
    let Some(message) = parse_apply_message(line) else {
      return Vec::new();
    };

    match message {
      ApplyMessage::Started { address } => vec![ResourceApplyEvent::new(address, ResourceApplyState::Applying)],
      ApplyMessage::Completed { address } => vec![ResourceApplyEvent::new(address, ResourceApplyState::Succeeded)],
      ApplyMessage::Errored { address } => {
        self.errored.entry(address).or_insert(None);
        Vec::new()
      }
      ApplyMessage::Diagnostic {
        address: Some(address),
        summary,
        detail,
      } => {
        self.errored.insert(address, Some(diagnostic_message(summary, &detail)));
        Vec::new()
      }
      ApplyMessage::Diagnostic {
        address: None,
        summary,
        detail,
      } => {
        warn!(summary = %summary, "engine reported an error without a resource address");
        self.diagnostics.push(format!("Error: {}", diagnostic_message(summary, &detail)));
        Vec::new()
      }
    }
  }

  /// Collected diagnostics followed by whatever the engine wrote to stderr.
  fn engine_output(&self, stderr: &str) -> String {
    let mut parts = self.diagnostics.clone();
    let stderr = stderr.trim_end();
    if !stderr.is_empty() {
      parts.push(stderr.to_string());
    }
    parts.join("\n")
  }

  fn finish(&mut self) -> Vec<ResourceApplyEvent> {
    let errored = std::mem::take(&mut self.errored);
    self.failed += errored.len();
    errored
      .into_iter()
      .map(|(address, message)| {
        let message = message.unwrap_or_else(|| "apply errored".to_string());
        ResourceApplyEvent::new(address, ResourceApplyState::Failed { message })
      })
      .collect()
  }
}

fn diagnostic_message(summary: String, detail: &str) -> String {
  if detail.is_empty() {
    summary
  } else {
    format!("{}: {}", summary, detail)
  }
}
