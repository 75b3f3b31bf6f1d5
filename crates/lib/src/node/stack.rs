//! Stacks, apps and tree traversal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::RESERVED_STACK_IDS;

use super::id::{sanitize, unique_id};
use super::types::{ConfigNode, NodeError, NodeKind, check_id};

/// A named root of a configuration tree.
///
/// The stack name is the first component of every node path below it, and its
/// own unique id names the stack's manifest artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
  pub name: String,
  #[serde(default)]
  pub children: Vec<ConfigNode>,
}

/// A visited node together with its path.
#[derive(Debug, Clone, Copy)]
pub struct VisitedNode<'a> {
  pub node: &'a ConfigNode,
  /// Path components from the stack name down to this node.
  pub path: &'a [&'a str],
}

impl VisitedNode<'_> {
  pub fn unique_id(&self) -> String {
    unique_id(self.path)
  }

  pub fn path_string(&self) -> String {
    self.path.join("/")
  }
}

/// Lookup from unique id to node path, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackIndex {
  pub entries: BTreeMap<String, String>,
}

impl StackIndex {
  pub fn path_of(&self, unique_id: &str) -> Option<&str> {
    self.entries.get(unique_id).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl Stack {
  /// Create an empty stack.
  pub fn new(name: impl Into<String>) -> Result<Self, NodeError> {
    let name = name.into();
    check_stack_name(&name)?;
    Ok(Self {
      name,
      children: Vec::new(),
    })
  }

  /// Append a top-level node.
  pub fn add_child(&mut self, child: ConfigNode) -> Result<&mut Self, NodeError> {
    check_id(&child.id, &self.name)?;
    if self.children.iter().any(|c| c.id == child.id) {
      return Err(NodeError::DuplicateId {
        id: child.id,
        parent: self.name.clone(),
      });
    }
    self.children.push(child);
    Ok(self)
  }

  /// Unique id of the stack itself, used to name its manifest.
  pub fn unique_id(&self) -> String {
    unique_id(&[self.name.as_str()])
  }

  /// Visit every node in pre-order: parent before children, children in
  /// declaration order.
  pub fn walk<'a, F>(&'a self, mut visit: F)
  where
    F: FnMut(VisitedNode<'_>),
  {
    let mut path: Vec<&'a str> = vec![self.name.as_str()];
    for child in &self.children {
      walk_node(child, &mut path, &mut visit);
    }
  }

  /// Check structural invariants of a tree that was built without the
  /// checked builders (for example deserialized from an app document).
  pub fn validate(&self) -> Result<StackIndex, NodeError> {
    check_stack_name(&self.name)?;
    check_siblings(&self.children, &self.name)?;

    let mut first_error = None;
    self.walk(|visited| {
      if first_error.is_some() {
        return;
      }
      let node = visited.node;
      if node.kind == NodeKind::Leaf && !node.children.is_empty() {
        first_error = Some(NodeError::LeafHasChildren {
          path: visited.path_string(),
        });
        return;
      }
      if let Err(e) = check_siblings(&node.children, &visited.path_string()) {
        first_error = Some(e);
      }
    });
    if let Some(e) = first_error {
      return Err(e);
    }

    self.index()
  }

  /// Build the unique id index, failing on collisions.
  pub fn index(&self) -> Result<StackIndex, NodeError> {
    let mut index = StackIndex::default();
    index.entries.insert(self.unique_id(), self.name.clone());

    let mut collision = None;
    self.walk(|visited| {
      if collision.is_some() {
        return;
      }
      let uid = visited.unique_id();
      let path = visited.path_string();
      if let Some(existing) = index.entries.get(&uid) {
        collision = Some(NodeError::DuplicateUniqueId {
          unique_id: uid,
          first: existing.clone(),
          second: path,
        });
        return;
      }
      index.entries.insert(uid, path);
    });

    match collision {
      Some(e) => Err(e),
      None => Ok(index),
    }
  }
}

fn walk_node<'a, F>(node: &'a ConfigNode, path: &mut Vec<&'a str>, visit: &mut F)
where
  F: FnMut(VisitedNode<'_>),
{
  path.push(node.id.as_str());
  visit(VisitedNode { node, path });
  for child in &node.children {
    walk_node(child, path, visit);
  }
  path.pop();
}

fn check_stack_name(name: &str) -> Result<(), NodeError> {
  check_id(name, "app")?;
  if sanitize(name).is_empty() {
    return Err(NodeError::InvalidId {
      id: name.to_string(),
      parent: "app".to_string(),
    });
  }
  let uid = unique_id(&[name]);
  if RESERVED_STACK_IDS.iter().any(|reserved| uid.eq_ignore_ascii_case(reserved)) {
    return Err(NodeError::ReservedStackName {
      name: name.to_string(),
      unique_id: uid,
    });
  }
  Ok(())
}

fn check_siblings(children: &[ConfigNode], parent: &str) -> Result<(), NodeError> {
  for (i, child) in children.iter().enumerate() {
    check_id(&child.id, parent)?;
    if children[..i].iter().any(|c| c.id == child.id) {
      return Err(NodeError::DuplicateId {
        id: child.id.clone(),
        parent: parent.to_string(),
      });
    }
  }
  Ok(())
}

/// A set of stacks synthesized together into one output directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
  #[serde(default)]
  pub stacks: Vec<Stack>,
}

impl App {
  /// Parse an app document.
  pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(content)
  }

  /// Find a stack by name.
  pub fn stack(&self, name: &str) -> Result<&Stack, NodeError> {
    self
      .stacks
      .iter()
      .find(|s| s.name == name)
      .ok_or_else(|| NodeError::UnknownStack(name.to_string()))
  }

  /// Validate every stack and check stack names are unique.
  pub fn validate(&self) -> Result<(), NodeError> {
    for (i, stack) in self.stacks.iter().enumerate() {
      if self.stacks[..i].iter().any(|s| s.unique_id() == stack.unique_id()) {
        return Err(NodeError::DuplicateId {
          id: stack.name.clone(),
          parent: "app".to_string(),
        });
      }
      stack.validate()?;
    }
    Ok(())
  }
}
