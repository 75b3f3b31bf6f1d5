//! The configuration node tree.
//!
//! Application code builds one [`Stack`] per deployable unit out of
//! [`ConfigNode`]s. Containers group nodes; leaves carry an [`Element`] that
//! emits a Terraform JSON fragment during synthesis. Nodes are addressed by
//! their path from the stack root, and every node gets a path-derived
//! [`unique_id`] that is unique within the tree.

mod id;
mod stack;
mod types;

pub use id::{sanitize, strip_hash_suffix, unique_id};
pub use stack::{App, Stack, StackIndex, VisitedNode};
pub use types::{ConfigNode, Element, Fragment, NodeError, NodeKind};
