use anyhow::{Context, Result, bail};
use std::io::{self, IsTerminal, Write};

use tfstack_lib::engine::CancelToken;

/// Ask a yes/no question on stderr. `approved` skips the prompt.
pub fn confirm(message: &str, approved: bool) -> Result<bool> {
  if approved {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot ask for approval in non-interactive mode. Use --auto-approve to deploy.");
  }

  write!(io::stderr(), "{} [y/N] ", message)?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().read_line(&mut input)?;

  Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// [`confirm`] that gives up when `cancel` fires, returning `None`.
///
/// Ctrl-C only cancels the token once its handler is installed, so a plain
/// blocking prompt would keep waiting for input.
pub async fn confirm_or_cancel(message: &'static str, approved: bool, cancel: &CancelToken) -> Result<Option<bool>> {
  if approved {
    return Ok(Some(true));
  }
  if cancel.is_cancelled() {
    return Ok(None);
  }

  let prompt = tokio::task::spawn_blocking(move || confirm(message, false));
  tokio::select! {
    biased;
    _ = cancel.cancelled() => {
      eprintln!();
      Ok(None)
    }
    answer = prompt => answer.context("Approval prompt failed")?.map(Some),
  }
}
