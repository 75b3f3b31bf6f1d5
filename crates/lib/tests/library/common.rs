//! Shared helpers for library integration tests.

use serde_json::Value;
use tfstack_lib::engine::{EngineError, ExecutionEngine, ResourceApplyEvent};
use tfstack_lib::node::{ConfigNode, Fragment, Stack};
use tfstack_lib::plan::{PlanSummary, PlannedResource};
use tfstack_lib::synth::SynthOutput;
use tokio::sync::mpsc;

pub fn fragment(value: Value) -> Fragment {
  value.as_object().cloned().expect("fragment must be an object")
}

/// Build a stack from top-level nodes.
pub fn stack(name: &str, nodes: Vec<ConfigNode>) -> Stack {
  let mut stack = Stack::new(name).unwrap();
  for node in nodes {
    stack.add_child(node).unwrap();
  }
  stack
}

/// Engine that answers with a fixed plan and replays fixed apply events.
#[derive(Default)]
pub struct FakeEngine {
  pub resources: Vec<PlannedResource>,
  pub url: Option<String>,
  pub events: Vec<ResourceApplyEvent>,
  pub plan_stderr: Option<String>,
}

impl ExecutionEngine for FakeEngine {
  async fn plan(&self, stack: &SynthOutput) -> Result<PlanSummary, EngineError> {
    if let Some(stderr) = &self.plan_stderr {
      return Err(EngineError::Failed {
        command: "terraform plan".to_string(),
        code: Some(1),
        stderr: stderr.clone(),
      });
    }
    let mut summary = PlanSummary::new(self.resources.clone(), stack.out_dir().join("plan"));
    summary.url = self.url.clone();
    Ok(summary)
  }

  async fn apply(
    &self,
    _plan: &PlanSummary,
    events: mpsc::UnboundedSender<ResourceApplyEvent>,
  ) -> Result<(), EngineError> {
    for event in &self.events {
      let _ = events.send(event.clone());
    }
    Ok(())
  }
}
