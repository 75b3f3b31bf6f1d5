//! Deploy lifecycle over synthesized stacks.

use serde_json::json;
use tempfile::TempDir;
use tfstack_lib::deploy::{DeployMachine, DeployMode, ErrorKind, Status, run_stack};
use tfstack_lib::engine::{CancelToken, ResourceApplyEvent, ResourceApplyState};
use tfstack_lib::node::ConfigNode;
use tfstack_lib::plan::{PlannedResource, PlannedResourceAction};
use tfstack_lib::synth::synthesize;

use super::common::{FakeEngine, fragment, stack};

fn synthesized(temp: &TempDir) -> tfstack_lib::synth::SynthOutput {
  let stack = stack(
    "testing",
    vec![ConfigNode::raw("bar", fragment(json!({"resource": {"foo": {"bar_1": {}}}})))],
  );
  synthesize(&stack, temp.path()).unwrap()
}

#[tokio::test]
async fn single_create_plan_counts_one_create() {
  let temp = TempDir::new().unwrap();
  let engine = FakeEngine {
    resources: vec![PlannedResource::new("foo.bar_1", PlannedResourceAction::Create)],
    ..Default::default()
  };
  let machine = DeployMachine::new();

  let state = run_stack(&engine, &machine, &synthesized(&temp), DeployMode::Diff, &CancelToken::never()).await;

  assert_eq!(state.status, Status::Done);
  let plan = state.plan.as_ref().unwrap();
  assert_eq!(plan.resources.len(), 1);
  assert_eq!(plan.resources[0].id, "foo.bar_1");
  let counts = state.counts.unwrap();
  assert_eq!((counts.create, counts.update, counts.delete), (1, 0, 0));
}

#[tokio::test]
async fn empty_plan_is_done_without_applying() {
  let temp = TempDir::new().unwrap();
  let machine = DeployMachine::new();

  let state = run_stack(
    &FakeEngine::default(),
    &machine,
    &synthesized(&temp),
    DeployMode::Deploy,
    &CancelToken::never(),
  )
  .await;

  assert_eq!(state.status, Status::Done);
  assert!(!state.plan.unwrap().needs_apply());
  assert!(state.resources.is_empty());
}

#[tokio::test]
async fn remote_url_is_exposed_on_the_snapshot() {
  let temp = TempDir::new().unwrap();
  let engine = FakeEngine {
    url: Some("https://app.terraform.io/app/org/ws/runs/run-1".to_string()),
    ..Default::default()
  };
  let machine = DeployMachine::new();

  let state = run_stack(&engine, &machine, &synthesized(&temp), DeployMode::Diff, &CancelToken::never()).await;

  assert_eq!(state.url.as_deref(), Some("https://app.terraform.io/app/org/ws/runs/run-1"));
}

#[tokio::test]
async fn deploy_records_mixed_outcomes() {
  let temp = TempDir::new().unwrap();
  let engine = FakeEngine {
    resources: vec![
      PlannedResource::new("foo.a", PlannedResourceAction::Create),
      PlannedResource::new("foo.b", PlannedResourceAction::Delete),
      PlannedResource::new("foo.c", PlannedResourceAction::NoOp),
    ],
    events: vec![
      ResourceApplyEvent::new("foo.b", ResourceApplyState::Applying),
      ResourceApplyEvent::new(
        "foo.b",
        ResourceApplyState::Failed {
          message: "Error: still in use".to_string(),
        },
      ),
      ResourceApplyEvent::new("foo.a", ResourceApplyState::Succeeded),
    ],
    ..Default::default()
  };
  let machine = DeployMachine::new();
  let mut rx = machine.subscribe();

  let state = run_stack(&engine, &machine, &synthesized(&temp), DeployMode::Deploy, &CancelToken::never()).await;

  assert_eq!(state.status, Status::Done);
  assert_eq!(state.resources.len(), 2);
  assert_eq!(state.progress("foo.a").unwrap().state, ResourceApplyState::Succeeded);
  assert!(matches!(
    state.progress("foo.b").unwrap().state,
    ResourceApplyState::Failed { .. }
  ));
  assert!(rx.has_changed().unwrap());
  assert_eq!(rx.borrow_and_update().status, Status::Done);
}

#[tokio::test]
async fn engine_diagnostics_reach_the_snapshot() {
  let temp = TempDir::new().unwrap();
  let engine = FakeEngine {
    plan_stderr: Some("Error: Invalid provider configuration".to_string()),
    ..Default::default()
  };
  let machine = DeployMachine::new();

  let state = run_stack(&engine, &machine, &synthesized(&temp), DeployMode::Deploy, &CancelToken::never()).await;

  assert_eq!(state.status, Status::Errored);
  let error = state.error.unwrap();
  assert_eq!(error.kind, ErrorKind::ExternalEngine);
  assert!(error.message.contains("Error: Invalid provider configuration"));
}
