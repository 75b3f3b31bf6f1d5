//! Synth command integration tests.

use predicates::prelude::*;
use serde_json::{Value, json};

use super::common::{TestEnv, read_json};

#[test]
fn synth_writes_manifest_and_providers() {
  let env = TestEnv::from_fixture("single_resource.json");

  env
    .tfstack_cmd()
    .arg("synth")
    .assert()
    .success()
    .stdout(predicate::str::contains("Synthesized stack testing"));

  assert_eq!(
    read_json(&env.out_dir().join("testing.tf.json")),
    json!({"resource": {"foo": {"bar_1": {}}}})
  );
  assert_eq!(
    read_json(&env.out_dir().join("providers.tf.json")),
    json!({"provider": {"aws": {"region": "us-east-1"}}})
  );
}

#[test]
fn synth_accumulates_providers_of_every_stack() {
  let env = TestEnv::from_fixture("two_stacks.json");

  env.tfstack_cmd().arg("synth").assert().success();

  let providers = read_json(&env.out_dir().join("providers.tf.json"));
  assert_eq!(providers["provider"]["aws"], json!({"region": "eu-west-1"}));
  assert_eq!(providers["provider"]["google"], json!({"project": "acme"}));

  let dns = read_json(&env.out_dir().join("dns.tf.json"));
  let zones = dns["resource"]["google_dns_managed_zone"].as_object().unwrap();
  assert!(zones.keys().all(|k| k.starts_with("dns_zones_primary_")));
}

#[test]
fn synth_single_stack_and_custom_output() {
  let env = TestEnv::from_fixture("two_stacks.json");

  env
    .tfstack_cmd()
    .args(["synth", "--stack", "network", "--output", "build"])
    .assert()
    .success();

  assert!(env.path().join("build").join("network.tf.json").exists());
  assert!(!env.path().join("build").join("dns.tf.json").exists());
}

#[test]
fn synth_output_from_environment() {
  let env = TestEnv::from_fixture("single_resource.json");

  env
    .tfstack_cmd()
    .arg("synth")
    .env("TFSTACK_OUTPUT", env.path().join("from-env"))
    .assert()
    .success();

  assert!(env.path().join("from-env").join("testing.tf.json").exists());
}

#[test]
fn synth_json_lists_artifacts() {
  let env = TestEnv::from_fixture("single_resource.json");

  let output = env.tfstack_cmd().args(["synth", "--json"]).output().unwrap();

  assert!(output.status.success());
  let value: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(value[0]["stack_name"], "testing");
  assert_eq!(value[0]["stack_id"], "testing");
}

#[test]
fn synth_unknown_stack_fails() {
  let env = TestEnv::from_fixture("single_resource.json");

  env
    .tfstack_cmd()
    .args(["synth", "--stack", "missing"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing"));
}

#[test]
fn synth_corrupt_provider_artifact_fails() {
  let env = TestEnv::from_fixture("single_resource.json");
  env.write_file("tfstack.out/providers.tf.json", "not json");

  env
    .tfstack_cmd()
    .arg("synth")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to synthesize stack 'testing'"));
}
