//! Implementation of the `tfstack synth` command.
//!
//! Writes one manifest per stack plus the shared provider artifact.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;

use crate::cmd::{Project, ProjectArgs};
use crate::output::{format_elapsed, print_json, print_stat, print_success};

pub fn cmd_synth(dir: &Path, args: &ProjectArgs, json: bool) -> Result<()> {
  let started = Instant::now();
  let project = Project::load(dir, args)?;
  let outputs = project.synthesize()?;

  if json {
    return print_json(&outputs);
  }

  for output in &outputs {
    print_success(&format!("Synthesized stack {}", output.stack_name));
    print_stat("Manifest", &output.manifest_path.display().to_string());
  }
  if let Some(first) = outputs.first() {
    print_stat("Providers", &first.provider_path.display().to_string());
  }
  print_stat("Took", &format_elapsed(started.elapsed()));

  Ok(())
}
