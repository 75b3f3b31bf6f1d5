//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Plan output of a stack with one resource to create.
pub const SHOW_ONE_CREATE: &str = r#"{"resource_changes":[{"address":"foo.bar_1","change":{"actions":["create"]}}]}"#;

/// Apply output reporting `foo.bar_1` as created.
pub const APPLY_ONE_CREATE: &str = concat!(
  r#"{"type":"version","terraform":"1.9.0"}"#,
  "\n",
  r#"{"type":"apply_start","hook":{"resource":{"addr":"foo.bar_1"}}}"#,
  "\n",
  r#"{"type":"apply_complete","hook":{"resource":{"addr":"foo.bar_1"}}}"#,
);

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

pub fn read_json(path: &Path) -> Value {
  serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Isolated project directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create a project whose `app.json` is the given fixture.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("app.json"), fixture_content(name)).unwrap();
    Self { temp }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Default output directory.
  pub fn out_dir(&self) -> PathBuf {
    self.path().join("tfstack.out")
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Write `tfstack.json`.
  pub fn write_config(&self, config: Value) {
    self.write_file("tfstack.json", &serde_json::to_string_pretty(&config).unwrap());
  }

  /// Point the project at a scripted terraform stand-in.
  ///
  /// `show` prints `show_json`, `apply` prints `apply_lines`; a non-zero
  /// `exit_code` makes every subcommand fail with `Error: fake failure`.
  pub fn use_fake_terraform(&self, show_json: &str, apply_lines: &str, exit_code: i32) {
    let root = self.path().join("fake-terraform");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("show.json"), show_json).unwrap();
    std::fs::write(root.join("apply.jsonl"), apply_lines).unwrap();
    let script = format!(
      r#"root='{root}'
if [ {code} -ne 0 ]; then
  echo "Error: fake failure" >&2
  exit {code}
fi
case "$1" in
  plan) touch plan ;;
  show) cat "$root/show.json" ;;
  apply) cat "$root/apply.jsonl"; echo ;;
esac
exit 0
"#,
      root = root.display(),
      code = exit_code,
    );
    let script_path = root.join("terraform.sh");
    std::fs::write(&script_path, script).unwrap();

    self.write_config(json!({
      "terraform_binary": "/bin/sh",
      "terraform_args": [script_path.display().to_string()],
    }));
  }

  /// Command for the tfstack binary, run inside the project directory.
  pub fn tfstack_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("tfstack");
    cmd.current_dir(self.path());
    cmd.env_remove("TFSTACK_OUTPUT");
    cmd.env_remove("TFSTACK_TERRAFORM_BINARY");
    cmd.env_remove("RUST_LOG");
    cmd.env("NO_COLOR", "1");
    cmd
  }
}
