//! Diff and deploy command integration tests against a scripted engine.

#![cfg(unix)]

use predicates::prelude::*;
use serde_json::Value;

use super::common::{APPLY_ONE_CREATE, SHOW_ONE_CREATE, TestEnv};

#[test]
fn diff_renders_planned_resources() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.use_fake_terraform(SHOW_ONE_CREATE, "", 0);

  env
    .tfstack_cmd()
    .arg("diff")
    .assert()
    .success()
    .stdout(predicate::str::contains("Stack: testing"))
    .stdout(predicate::str::contains(
      " + FOO                  bar_1               foo.bar_1",
    ))
    .stdout(predicate::str::contains("Diff: 1 to create, 0 to update, 0 to delete."));
}

#[test]
fn diff_json_reports_final_state() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.use_fake_terraform(SHOW_ONE_CREATE, "", 0);

  let output = env.tfstack_cmd().args(["diff", "--json"]).output().unwrap();

  assert!(output.status.success());
  let states: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(states[0]["status"], "done");
  assert_eq!(states[0]["counts"]["create"], 1);
  assert_eq!(states[0]["plan"]["resources"][0]["id"], "foo.bar_1");
}

#[test]
fn deploy_applies_and_summarizes() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.use_fake_terraform(SHOW_ONE_CREATE, APPLY_ONE_CREATE, 0);

  env
    .tfstack_cmd()
    .args(["deploy", "--auto-approve"])
    .assert()
    .success()
    .stdout(predicate::str::contains("foo.bar_1  created"))
    .stdout(predicate::str::contains("Summary: 1 created, 0 updated, 0 destroyed."));
}

#[test]
fn deploy_without_changes_skips_apply() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.use_fake_terraform(r#"{"resource_changes":[]}"#, "", 0);

  env
    .tfstack_cmd()
    .arg("deploy")
    .assert()
    .success()
    .stdout(predicate::str::contains("Diff: 0 to create, 0 to update, 0 to delete."));
}

#[test]
fn deploy_requires_approval_when_not_interactive() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.use_fake_terraform(SHOW_ONE_CREATE, APPLY_ONE_CREATE, 0);

  env
    .tfstack_cmd()
    .arg("deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--auto-approve"));
}

#[test]
fn engine_failure_is_rendered_and_exits_non_zero() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.use_fake_terraform(SHOW_ONE_CREATE, "", 1);

  env
    .tfstack_cmd()
    .args(["deploy", "--auto-approve"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("Stack: testing"))
    .stdout(predicate::str::contains("Error:"))
    .stdout(predicate::str::contains("Error: fake failure"));
}

#[test]
fn missing_engine_binary_is_reported() {
  let env = TestEnv::from_fixture("single_resource.json");

  env
    .tfstack_cmd()
    .arg("diff")
    .env("TFSTACK_TERRAFORM_BINARY", env.path().join("no-such-terraform"))
    .assert()
    .failure()
    .stdout(predicate::str::contains("failed to start"));
}

#[test]
fn synthesis_failure_errors_the_stack() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.use_fake_terraform(SHOW_ONE_CREATE, "", 0);
  env.write_file("blocked", "not a directory");

  let output = env
    .tfstack_cmd()
    .args(["diff", "--json", "--output", "blocked"])
    .output()
    .unwrap();

  assert!(!output.status.success());
  let states: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(states[0]["status"], "errored");
  assert_eq!(states[0]["stack_name"], "testing");
  assert_eq!(states[0]["error"]["kind"], "synthesis_io");
}

#[test]
fn synthesis_failure_is_rendered_for_every_stack() {
  let env = TestEnv::from_fixture("two_stacks.json");
  env.use_fake_terraform(SHOW_ONE_CREATE, APPLY_ONE_CREATE, 0);
  env.write_file("blocked", "not a directory");

  env
    .tfstack_cmd()
    .args(["deploy", "--auto-approve", "--output", "blocked"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("Stack: network"))
    .stdout(predicate::str::contains("Stack: dns"))
    .stdout(predicate::str::contains("Error: failed to create output directory"));
}
