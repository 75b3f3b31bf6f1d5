mod cmd;
mod output;
mod prompts;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tfstack_lib::get::Language;

use cmd::{ProjectArgs, cmd_deploy, cmd_diff, cmd_get, cmd_synth};
use output::print_error;

/// tfstack - synthesize and deploy Terraform stacks
#[derive(Parser)]
#[command(name = "tfstack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Project directory containing tfstack.json (default: current directory)
  #[arg(short = 'C', long, global = true)]
  dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Synthesize stacks into Terraform JSON manifests
  Synth {
    #[command(flatten)]
    project: ProjectArgs,

    /// Print the written artifacts as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the changes the engine would make
  Diff {
    #[command(flatten)]
    project: ProjectArgs,

    /// Print the final deploy state as JSON
    #[arg(long)]
    json: bool,
  },

  /// Plan and apply stacks
  Deploy {
    #[command(flatten)]
    project: ProjectArgs,

    /// Apply without asking for approval
    #[arg(long)]
    auto_approve: bool,

    /// Print the final deploy state as JSON
    #[arg(long)]
    json: bool,
  },

  /// Generate provider bindings
  Get {
    /// Target language (default from tfstack.json)
    #[arg(short, long, value_parser = parse_language)]
    language: Option<Language>,

    /// Output directory for generated bindings
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
  },
}

fn parse_language(s: &str) -> Result<Language, String> {
  s.parse().map_err(|e: tfstack_lib::get::GetError| e.to_string())
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let dir = match cli.dir {
    Some(dir) => dir,
    None => std::env::current_dir().context("Failed to determine current directory")?,
  };
  let dir = dunce::canonicalize(&dir).unwrap_or(dir);

  let succeeded = match cli.command {
    Commands::Synth { project, json } => cmd_synth(&dir, &project, json).map(|()| true),
    Commands::Diff { project, json } => cmd_diff(&dir, &project, cli.verbose, json),
    Commands::Deploy {
      project,
      auto_approve,
      json,
    } => cmd_deploy(&dir, &project, auto_approve, cli.verbose, json),
    Commands::Get { language, output, json } => cmd_get(&dir, language, output, json).map(|()| true),
  };

  match succeeded {
    Ok(true) => Ok(()),
    Ok(false) => std::process::exit(1),
    Err(e) => {
      print_error(&format!("{:#}", e));
      std::process::exit(1);
    }
  }
}
