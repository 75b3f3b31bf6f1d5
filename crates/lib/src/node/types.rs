//! Node and element types for the configuration tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::consts::PROVIDER_KEY;

/// A nested JSON mapping emitted by one node.
pub type Fragment = Map<String, Value>;

/// Whether a node may own children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
  /// A node without children.
  Leaf,
  /// A node grouping other nodes.
  #[default]
  Container,
}

/// The fragment-emission capability of a node.
///
/// Typed variants key their body by the node's unique id so logical names in
/// the manifest never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
  /// Emits the fragment verbatim.
  Raw { fragment: Fragment },
  /// `{"resource": {<resource_type>: {<uid>: body}}}`
  Resource { resource_type: String, body: Fragment },
  /// `{"data": {<data_type>: {<uid>: body}}}`
  Data { data_type: String, body: Fragment },
  /// `{"provider": {<provider_type>: body}}`
  Provider { provider_type: String, body: Fragment },
  /// `{"output": {<uid>: body}}`
  Output { body: Fragment },
  /// `{"variable": {<uid>: body}}`
  Variable { body: Fragment },
  /// `{"terraform": {"backend": {<backend_type>: body}}}`
  Backend { backend_type: String, body: Fragment },
}

impl Element {
  /// Render this element as a fragment for the node with the given unique id.
  pub fn to_fragment(&self, unique_id: &str) -> Fragment {
    let value = match self {
      Element::Raw { fragment } => return fragment.clone(),
      Element::Resource { resource_type, body } => json!({ "resource": { resource_type: { unique_id: body } } }),
      Element::Data { data_type, body } => json!({ "data": { data_type: { unique_id: body } } }),
      Element::Provider { provider_type, body } => json!({ PROVIDER_KEY: { provider_type: body } }),
      Element::Output { body } => json!({ "output": { unique_id: body } }),
      Element::Variable { body } => json!({ "variable": { unique_id: body } }),
      Element::Backend { backend_type, body } => json!({ "terraform": { "backend": { backend_type: body } } }),
    };
    match value {
      Value::Object(map) => map,
      _ => Fragment::new(),
    }
  }
}

/// A node in the configuration tree.
///
/// Children are owned exclusively by their parent and visited in declaration
/// order. The `id` is local: it must be unique among siblings, while the
/// tree-wide identifier is derived from the node's path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
  pub id: String,
  #[serde(default)]
  pub kind: NodeKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub element: Option<Element>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<ConfigNode>,
}

/// Errors raised while building or validating a tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
  #[error("node id must not be empty (under {parent})")]
  EmptyId { parent: String },

  #[error("node id {id:?} must not contain '/' (under {parent})")]
  InvalidId { id: String, parent: String },

  #[error("there is already a node with id {id:?} under {parent}")]
  DuplicateId { id: String, parent: String },

  #[error("leaf node {path} cannot have children")]
  LeafHasChildren { path: String },

  #[error("unique id {unique_id} is shared by {first} and {second}")]
  DuplicateUniqueId {
    unique_id: String,
    first: String,
    second: String,
  },

  #[error("stack {0:?} is not part of the app")]
  UnknownStack(String),

  #[error("stack name {name:?} is reserved, its manifest would collide with {unique_id}")]
  ReservedStackName { name: String, unique_id: String },
}

impl ConfigNode {
  /// Create an empty container.
  pub fn container(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      kind: NodeKind::Container,
      element: None,
      children: Vec::new(),
    }
  }

  /// Create a leaf carrying an element.
  pub fn leaf(id: impl Into<String>, element: Element) -> Self {
    Self {
      id: id.into(),
      kind: NodeKind::Leaf,
      element: Some(element),
      children: Vec::new(),
    }
  }

  /// Create a leaf emitting a raw fragment.
  pub fn raw(id: impl Into<String>, fragment: Fragment) -> Self {
    Self::leaf(id, Element::Raw { fragment })
  }

  /// Create a leaf declaring a resource.
  pub fn resource(id: impl Into<String>, resource_type: impl Into<String>, body: Fragment) -> Self {
    Self::leaf(
      id,
      Element::Resource {
        resource_type: resource_type.into(),
        body,
      },
    )
  }

  /// Create a leaf declaring a provider.
  pub fn provider(id: impl Into<String>, provider_type: impl Into<String>, body: Fragment) -> Self {
    Self::leaf(
      id,
      Element::Provider {
        provider_type: provider_type.into(),
        body,
      },
    )
  }

  /// Attach an element to this node, returning it.
  pub fn with_element(mut self, element: Element) -> Self {
    self.element = Some(element);
    self
  }

  /// Append a child, enforcing sibling-unique ids and leaf childlessness.
  pub fn add_child(&mut self, child: ConfigNode) -> Result<&mut Self, NodeError> {
    if self.kind == NodeKind::Leaf {
      return Err(NodeError::LeafHasChildren { path: self.id.clone() });
    }
    check_id(&child.id, &self.id)?;
    if self.children.iter().any(|c| c.id == child.id) {
      return Err(NodeError::DuplicateId {
        id: child.id,
        parent: self.id.clone(),
      });
    }
    self.children.push(child);
    Ok(self)
  }

  /// Look up a direct child by local id.
  pub fn child(&self, id: &str) -> Option<&ConfigNode> {
    self.children.iter().find(|c| c.id == id)
  }
}

pub(crate) fn check_id(id: &str, parent: &str) -> Result<(), NodeError> {
  if id.is_empty() {
    return Err(NodeError::EmptyId {
      parent: parent.to_string(),
    });
  }
  if id.contains('/') {
    return Err(NodeError::InvalidId {
      id: id.to_string(),
      parent: parent.to_string(),
    });
  }
  Ok(())
}
