//! Get command integration tests.

use predicates::prelude::*;
use serde_json::json;

use super::common::TestEnv;

#[cfg(unix)]
#[test]
fn get_runs_generator_and_reports_language() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.write_file("gen.sh", "mkdir -p \"$4\" && touch \"$4/index.go\"\n");
  env.write_config(json!({
    "language": "go",
    "codegen_command": ["/bin/sh", env.path().join("gen.sh").display().to_string()],
  }));

  env
    .tfstack_cmd()
    .arg("get")
    .assert()
    .success()
    .stdout(predicate::str::contains("Generated go constructs in the output directory"))
    .stdout(predicate::str::contains("go mod tidy"));

  assert!(env.path().join(".gen").join("index.go").exists());
}

#[cfg(unix)]
#[test]
fn get_fails_when_generator_writes_nothing() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.write_file("gen.sh", "exit 0\n");
  env.write_config(json!({
    "codegen_command": ["/bin/sh", env.path().join("gen.sh").display().to_string()],
  }));

  env
    .tfstack_cmd()
    .args(["get", "--language", "python"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("synthesis failed, expected output directory"));
}

#[test]
fn get_without_generator_fails() {
  let env = TestEnv::from_fixture("single_resource.json");

  env
    .tfstack_cmd()
    .arg("get")
    .assert()
    .failure()
    .stderr(predicate::str::contains("codegen_command"));
}

#[test]
fn get_rejects_unknown_language() {
  let env = TestEnv::from_fixture("single_resource.json");

  env
    .tfstack_cmd()
    .args(["get", "--language", "cobol"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown language"));
}
