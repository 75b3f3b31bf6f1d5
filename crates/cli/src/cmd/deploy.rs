//! Implementation of the `tfstack deploy` command.
//!
//! For each selected stack: synthesize, plan, show the diff, ask for approval
//! and apply. Resource outcomes are streamed to stderr while applying.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use tfstack_lib::deploy::{
  DeployFailure, DeployMachine, DeployState, Status, apply_stack, finish_without_apply, plan_stack, synthesis_failed,
};

use crate::cmd::{Project, ProjectArgs, runtime_with_interrupt};
use crate::output::{format_elapsed, print_info, print_json, print_stat, print_warning, stdout_color};
use crate::prompts::confirm_or_cancel;
use crate::render::{RenderOptions, progress_line, render_deploy, render_plan};

/// Returns false when any stack ended in Errored.
pub fn cmd_deploy(dir: &Path, args: &ProjectArgs, auto_approve: bool, verbose: bool, json: bool) -> Result<bool> {
  let started = Instant::now();
  let project = Project::load(dir, args)?;
  let engine = project.engine();
  let (rt, cancel) = runtime_with_interrupt()?;
  let opts = RenderOptions {
    verbose,
    color: stdout_color(),
  };

  let mut states = Vec::new();
  let mut interrupted = false;
  for stack in project.stacks()? {
    let machine = DeployMachine::new();
    let output = match project.synthesize_stack(stack) {
      Ok(output) => output,
      Err(err) => {
        let state = synthesis_failed(&machine, &stack.name, err);
        report(&state, opts, json);
        states.push(state);
        continue;
      }
    };
    let planned = rt.block_on(plan_stack(&engine, &machine, &output, &cancel));

    let state = if planned.status != Status::Planned {
      planned
    } else if !planned.plan.as_ref().is_some_and(|p| p.needs_apply()) {
      finish_without_apply(&machine)
    } else {
      if !json {
        println!("{}", render_plan(&planned, opts));
        println!();
      }
      match rt.block_on(confirm_or_cancel("Do you want to perform these actions?", auto_approve, &cancel))? {
        Some(true) => {
          let watcher = rt.spawn(report_progress(machine.subscribe(), json));
          let state = rt.block_on(apply_stack(&engine, &machine, &cancel));
          // The watcher ends once the machine is dropped.
          drop(machine);
          join_reporter(&rt, watcher);
          state
        }
        Some(false) => {
          print_info("Deploy declined");
          finish_without_apply(&machine)
        }
        None => {
          interrupted = true;
          if let Err(e) = machine.fail(DeployFailure::cancelled()) {
            debug!(error = %e, "deploy already finished");
          }
          machine.state()
        }
      }
    };

    report(&state, opts, json);
    states.push(state);
    if cancel.is_cancelled() {
      break;
    }
  }

  if interrupted {
    // The approval prompt may still be blocked reading stdin.
    rt.shutdown_background();
  }

  if json {
    print_json(&states)?;
  } else {
    print_stat("Took", &format_elapsed(started.elapsed()));
  }

  Ok(states.iter().all(|s| s.status != Status::Errored))
}

fn report(state: &DeployState, opts: RenderOptions, json: bool) {
  if json {
    return;
  }
  println!("{}", render_deploy(state, opts));
  let failed = state.failed_resources().count();
  if failed > 0 {
    print_warning(&format!("{} resource(s) failed to apply", failed));
  }
}

/// Wait for the progress reporter. Its failure never affects the deploy.
fn join_reporter(rt: &Runtime, watcher: JoinHandle<()>) {
  if let Err(e) = rt.block_on(watcher) {
    debug!(error = %e, "progress reporter failed");
  }
}

/// Print each resource state change to stderr as it happens.
async fn report_progress(mut rx: watch::Receiver<DeployState>, quiet: bool) {
  let mut previous = rx.borrow_and_update().clone();
  while rx.changed().await.is_ok() {
    let current = rx.borrow_and_update().clone();
    if !quiet {
      for progress in &current.resources {
        if previous.progress(&progress.id) != Some(progress) {
          eprintln!("{}", progress_line(progress, RenderOptions::default()));
        }
      }
    }
    previous = current;
  }
}
