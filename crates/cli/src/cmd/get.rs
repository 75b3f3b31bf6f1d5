//! Implementation of the `tfstack get` command.
//!
//! Regenerates provider bindings with the configured generator command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tfstack_lib::config::ProjectConfig;
use tfstack_lib::get::{CommandBindingGenerator, GetStatus, Language, run_get};

use crate::output::{print_info, print_json, print_success};

pub fn cmd_get(dir: &Path, language: Option<Language>, output: Option<PathBuf>, json: bool) -> Result<()> {
  let mut config = ProjectConfig::load(dir).context("Failed to load project configuration")?;
  if let Some(output) = output {
    config.codegen_output = output;
  }
  let config = config.resolve(dir);
  let language = language.unwrap_or(config.language);

  let command = config
    .codegen_command
    .clone()
    .context("No codegen_command configured in tfstack.json")?;
  let generator = CommandBindingGenerator::new(command)?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(run_get(&generator, language, &config.codegen_output, |status| {
      if !json && status != GetStatus::Done {
        print_info(&format!("{}...", status));
      }
    }))
    .context("Failed to generate bindings")?;

  if json {
    print_json(&report)?;
  } else {
    print_success(&report.to_string());
  }
  Ok(())
}
