//! Test utilities for tfstack-lib.
//!
//! A scripted stand-in for the `terraform` binary. Scripts are run through
//! `/bin/sh` rather than executed directly so freshly written files never hit
//! ETXTBSY on busy test runners.

use std::fs;
use std::path::{Path, PathBuf};

/// Write a fake engine under `dir` and return the program and prefix args to
/// invoke it.
///
/// - `init` and `plan` succeed silently (`plan` creates the plan file)
/// - `show` prints `show_json`
/// - `apply` prints `apply_lines`, then exits with the code set by
///   [`fake_terraform_apply_exit`] (0 by default)
/// - a non-zero `exit_code` makes every subcommand print `Error: fake failure`
///   to stderr and exit with that code
///
/// Every invocation is appended to `calls.log` in the same directory.
#[cfg(unix)]
pub fn fake_terraform(dir: &Path, show_json: &str, apply_lines: &str, exit_code: i32) -> (PathBuf, Vec<String>) {
  let root = dir.join("fake-terraform");
  fs::create_dir_all(&root).unwrap();
  fs::write(root.join("show.json"), show_json).unwrap();
  fs::write(root.join("apply.jsonl"), apply_lines).unwrap();

  let script = format!(
    r#"root='{root}'
echo "$@" >> "$root/calls.log"
if [ {code} -ne 0 ]; then
  echo "Error: fake failure" >&2
  exit {code}
fi
case "$1" in
  init) echo "Terraform has been successfully initialized!" ;;
  plan) touch plan; echo "Plan: ok" ;;
  show) cat "$root/show.json" ;;
  apply)
    cat "$root/apply.jsonl"; echo
    if [ -f "$root/apply.exit" ]; then exit "$(cat "$root/apply.exit")"; fi
    ;;
esac
exit 0
"#,
    root = root.display(),
    code = exit_code,
  );
  let script_path = root.join("terraform.sh");
  fs::write(&script_path, script).unwrap();

  (PathBuf::from("/bin/sh"), vec![script_path.display().to_string()])
}

/// Subcommands the fake engine was invoked with, one line per call.
#[cfg(unix)]
pub fn fake_terraform_calls(dir: &Path) -> Vec<String> {
  fs::read_to_string(dir.join("fake-terraform").join("calls.log"))
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}

/// Make only the `apply` subcommand of the fake engine exit with `code`.
#[cfg(unix)]
pub fn fake_terraform_apply_exit(dir: &Path, code: i32) {
  fs::write(dir.join("fake-terraform").join("apply.exit"), code.to_string()).unwrap();
}
