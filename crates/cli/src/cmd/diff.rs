//! Implementation of the `tfstack diff` command.
//!
//! Synthesizes the selected stacks and shows what the engine would change.

use std::path::Path;

use anyhow::Result;

use tfstack_lib::deploy::{DeployMachine, DeployMode, Status, run_stack, synthesis_failed};

use crate::cmd::{Project, ProjectArgs, runtime_with_interrupt};
use crate::output::{print_json, stdout_color};
use crate::render::{RenderOptions, render_plan};

/// Returns false when any stack ended in Errored.
pub fn cmd_diff(dir: &Path, args: &ProjectArgs, verbose: bool, json: bool) -> Result<bool> {
  let project = Project::load(dir, args)?;
  let engine = project.engine();
  let (rt, cancel) = runtime_with_interrupt()?;
  let opts = RenderOptions {
    verbose,
    color: stdout_color(),
  };

  let mut states = Vec::new();
  for stack in project.stacks()? {
    let machine = DeployMachine::new();
    let state = match project.synthesize_stack(stack) {
      Ok(output) => rt.block_on(run_stack(&engine, &machine, &output, DeployMode::Diff, &cancel)),
      Err(err) => synthesis_failed(&machine, &stack.name, err),
    };
    if !json {
      println!("{}", render_plan(&state, opts));
    }
    states.push(state);
    if cancel.is_cancelled() {
      break;
    }
  }

  if json {
    print_json(&states)?;
  }

  Ok(states.iter().all(|s| s.status != Status::Errored))
}
