//! Text views of deploy snapshots.
//!
//! Pure functions from [`DeployState`] to text. Columns are padded on the
//! plain text before any color is applied so alignment never depends on the
//! terminal.

use owo_colors::{OwoColorize, Style};

use tfstack_lib::deploy::{DeployState, ResourceProgress};
use tfstack_lib::engine::ResourceApplyState;
use tfstack_lib::plan::{ActionCounts, PlannedResource, PlannedResourceAction};

use crate::output::symbols;

const REMOTE_BANNER: &str = "Running plan in the remote backend. To view this run in a browser, visit:";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
  /// Also list resources without changes.
  pub verbose: bool,
  pub color: bool,
}

impl RenderOptions {
  fn paint(&self, text: &str, style: Style) -> String {
    if self.color {
      text.style(style).to_string()
    } else {
      text.to_string()
    }
  }
}

fn marker(action: PlannedResourceAction) -> (&'static str, Style) {
  match action {
    PlannedResourceAction::Create => (symbols::ADD, Style::new().green()),
    PlannedResourceAction::Update => (symbols::MODIFY, Style::new().yellow()),
    PlannedResourceAction::Delete => (symbols::REMOVE, Style::new().red()),
    PlannedResourceAction::NoOp => (symbols::UNCHANGED, Style::new().dimmed()),
  }
}

fn resource_row(resource: &PlannedResource, opts: RenderOptions) -> String {
  let (symbol, style) = marker(resource.action);
  let kind = format!("{:<20}", resource.resource_type().to_uppercase());
  let name = format!("{:<19}", resource.display_name());
  format!(
    " {} {} {} {}",
    opts.paint(symbol, style),
    opts.paint(&kind, Style::new().bold()),
    name,
    resource.id
  )
}

fn header(state: &DeployState, opts: RenderOptions, lines: &mut Vec<String>) {
  if let Some(url) = &state.url {
    lines.push(REMOTE_BANNER.to_string());
    lines.push(opts.paint(url, Style::new().cyan().underline()));
  }
  let name = state.stack_name.as_deref().unwrap_or_default();
  lines.push(format!("Stack: {}", opts.paint(name, Style::new().bold())));
}

fn error(state: &DeployState, opts: RenderOptions, lines: &mut Vec<String>) {
  if let Some(failure) = &state.error {
    lines.push(String::new());
    lines.push(format!(
      "{} {}",
      opts.paint("Error:", Style::new().red().bold()),
      failure.message
    ));
  }
}

/// The diff view: planned resources and their counts.
pub fn render_plan(state: &DeployState, opts: RenderOptions) -> String {
  let mut lines = Vec::new();
  header(state, opts, &mut lines);

  if let Some(plan) = &state.plan {
    let rows: Vec<&PlannedResource> = plan
      .resources
      .iter()
      .filter(|r| opts.verbose || r.action != PlannedResourceAction::NoOp)
      .collect();
    if !rows.is_empty() {
      lines.push("Resources".to_string());
      lines.extend(rows.into_iter().map(|r| resource_row(r, opts)));
    }

    let counts = state.counts.unwrap_or_else(|| plan.counts());
    lines.push(String::new());
    lines.push(diff_line(&counts));
  }

  error(state, opts, &mut lines);
  lines.join("\n")
}

pub fn diff_line(counts: &ActionCounts) -> String {
  format!(
    "Diff: {} to create, {} to update, {} to delete.",
    counts.create, counts.update, counts.delete
  )
}

fn outcome(progress: &ResourceProgress, opts: RenderOptions) -> String {
  match &progress.state {
    ResourceApplyState::Pending => opts.paint("pending", Style::new().dimmed()),
    ResourceApplyState::Applying => opts.paint("applying", Style::new().yellow()),
    ResourceApplyState::Succeeded => {
      let word = match progress.action {
        PlannedResourceAction::Create => "created",
        PlannedResourceAction::Update => "updated",
        PlannedResourceAction::Delete => "destroyed",
        PlannedResourceAction::NoOp => "unchanged",
      };
      opts.paint(word, Style::new().green())
    }
    ResourceApplyState::Failed { message } => {
      format!("{} {}", opts.paint("failed:", Style::new().red()), message)
    }
  }
}

/// Succeeded resources per action.
pub fn applied_counts(state: &DeployState) -> ActionCounts {
  let mut counts = ActionCounts::default();
  for progress in state.resources.iter().filter(|r| r.state == ResourceApplyState::Succeeded) {
    match progress.action {
      PlannedResourceAction::Create => counts.create += 1,
      PlannedResourceAction::Update => counts.update += 1,
      PlannedResourceAction::Delete => counts.delete += 1,
      PlannedResourceAction::NoOp => counts.noop += 1,
    }
  }
  counts
}

/// One progress line for a resource, used while applying.
pub fn progress_line(progress: &ResourceProgress, opts: RenderOptions) -> String {
  let resource = PlannedResource::new(progress.id.clone(), progress.action);
  format!("{}  {}", resource_row(&resource, opts), outcome(progress, opts))
}

/// The deploy view: per-resource outcomes and a summary.
///
/// Falls back to the diff view when nothing was applied.
pub fn render_deploy(state: &DeployState, opts: RenderOptions) -> String {
  if state.resources.is_empty() {
    return render_plan(state, opts);
  }

  let mut lines = Vec::new();
  header(state, opts, &mut lines);
  lines.push("Resources".to_string());
  lines.extend(state.resources.iter().map(|r| progress_line(r, opts)));

  let counts = applied_counts(state);
  lines.push(String::new());
  lines.push(format!(
    "Summary: {} created, {} updated, {} destroyed.",
    counts.create, counts.update, counts.delete
  ));

  error(state, opts, &mut lines);
  lines.join("\n")
}
