//! End-to-end synthesis tests.

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use serde_json::{Value, json};
use tempfile::TempDir;
use tfstack_lib::node::{App, ConfigNode, Element, NodeError};
use tfstack_lib::synth::{SynthError, synthesize, synthesize_app};

use super::common::{fragment, stack};

fn read_json(path: &std::path::Path) -> Value {
  serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn typed_elements_are_keyed_by_unique_id() {
  let temp = TempDir::new().unwrap();
  let mut network = ConfigNode::container("network");
  network
    .add_child(ConfigNode::resource("vpc", "aws_vpc", fragment(json!({"cidr_block": "10.0.0.0/16"}))))
    .unwrap();
  let stack = stack(
    "hello",
    vec![
      ConfigNode::provider("aws", "aws", fragment(json!({"region": "eu-west-1"}))),
      network,
    ],
  );

  let output = synthesize(&stack, temp.path()).unwrap();

  let manifest = read_json(&output.manifest_path);
  let vpcs = manifest["resource"]["aws_vpc"].as_object().unwrap();
  assert_eq!(vpcs.len(), 1);
  let (logical_id, body) = vpcs.iter().next().unwrap();
  assert!(logical_id.starts_with("hello_network_vpc_"), "got {}", logical_id);
  assert_eq!(body, &json!({"cidr_block": "10.0.0.0/16"}));
  assert!(manifest.get("provider").is_none());
  assert_eq!(
    read_json(&output.provider_path),
    json!({"provider": {"aws": {"region": "eu-west-1"}}})
  );
}

#[test]
fn app_document_round_trips_through_synthesis() {
  let temp = TempDir::new().unwrap();
  let app = App::from_json(
    r#"{
      "stacks": [
        {
          "name": "testing",
          "children": [
            {
              "id": "bar",
              "kind": "leaf",
              "element": {"type": "raw", "fragment": {"resource": {"foo": {"bar_1": {}}}}}
            }
          ]
        },
        {"name": "other"}
      ]
    }"#,
  )
  .unwrap();

  let outputs = synthesize_app(&app, temp.path()).unwrap();

  assert_eq!(outputs.len(), 2);
  assert_eq!(read_json(&outputs[0].manifest_path), json!({"resource": {"foo": {"bar_1": {}}}}));
  assert_eq!(read_json(&outputs[1].manifest_path), json!({}));
}

#[test]
fn duplicate_sibling_ids_are_rejected() {
  let mut parent = ConfigNode::container("parent");
  parent.add_child(ConfigNode::container("child")).unwrap();
  let err = parent.add_child(ConfigNode::container("child")).unwrap_err();
  assert!(matches!(err, NodeError::DuplicateId { .. }));
}

#[test]
fn leaf_with_children_fails_synthesis() {
  let temp = TempDir::new().unwrap();
  let mut leaf = ConfigNode::leaf(
    "leaf",
    Element::Raw {
      fragment: fragment(json!({})),
    },
  );
  leaf.children.push(ConfigNode::container("smuggled"));
  let stack = stack("testing", vec![leaf]);

  let result = synthesize(&stack, temp.path());

  assert!(matches!(result, Err(SynthError::Node(NodeError::LeafHasChildren { .. }))));
  assert!(!temp.path().join("testing.tf.json").exists());
}

#[test]
fn concurrent_stacks_union_their_providers() {
  let temp = TempDir::new().unwrap();
  let out = temp.path().to_path_buf();
  let barrier = Arc::new(Barrier::new(8));

  let handles: Vec<_> = (0..8)
    .map(|i| {
      let out = out.clone();
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        let provider = format!("provider{}", i);
        let stack = stack(
          &format!("stack{}", i),
          vec![ConfigNode::provider(
            "p",
            provider.as_str(),
            fragment(json!({"index": i})),
          )],
        );
        barrier.wait();
        synthesize(&stack, &out).unwrap();
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  let providers = read_json(&out.join("providers.tf.json"));
  let section = providers["provider"].as_object().unwrap();
  assert_eq!(section.len(), 8);
  for i in 0..8 {
    assert_eq!(section[&format!("provider{}", i)], json!({"index": i}));
  }
}

#[test]
fn shared_provider_keys_merge_recursively() {
  let temp = TempDir::new().unwrap();
  let first = stack(
    "first",
    vec![ConfigNode::provider(
      "aws",
      "aws",
      fragment(json!({"region": "us-east-1", "default_tags": {"tags": {"team": "a"}}})),
    )],
  );
  let second = stack(
    "second",
    vec![ConfigNode::provider(
      "aws",
      "aws",
      fragment(json!({"default_tags": {"tags": {"env": "prod"}}})),
    )],
  );

  synthesize(&first, temp.path()).unwrap();
  let output = synthesize(&second, temp.path()).unwrap();

  assert_eq!(
    read_json(&output.provider_path),
    json!({"provider": {"aws": {
      "region": "us-east-1",
      "default_tags": {"tags": {"team": "a", "env": "prod"}}
    }}})
  );
}
