//! Path-derived unique identifiers.
//!
//! Every node is addressed by its path from the stack root. The unique id is
//! a filesystem- and Terraform-safe rendering of that path: a single
//! component is used as-is (sanitized), longer paths are joined with `_` and
//! suffixed with a short hash of the full path.

use crate::consts::{HIDDEN_NODE_ID, UNIQUE_ID_HASH_LEN, UNIQUE_ID_MAX_LEN};
use crate::util::hash::{is_path_hash, path_hash};

/// Compute the unique id for a node path.
///
/// The first component is the stack name. Components equal to `Default` are
/// hidden from both the human-readable part and the hash.
pub fn unique_id(components: &[&str]) -> String {
  let visible: Vec<&str> = components.iter().copied().filter(|c| *c != HIDDEN_NODE_ID).collect();

  if let [single] = visible.as_slice() {
    let candidate = sanitize(single);
    if candidate.len() <= UNIQUE_ID_MAX_LEN {
      return candidate;
    }
  }

  let hash = path_hash(&visible);
  let mut human: Vec<String> = Vec::new();
  for component in &visible {
    let sanitized = sanitize(component);
    if sanitized.is_empty() || human.last() == Some(&sanitized) {
      continue;
    }
    human.push(sanitized);
  }

  let mut prefix = human.join("_");
  let max_prefix = UNIQUE_ID_MAX_LEN - UNIQUE_ID_HASH_LEN - 1;
  if prefix.len() > max_prefix {
    // Keep the most specific (rightmost) part of the path.
    prefix = prefix[prefix.len() - max_prefix..].to_string();
  }

  if prefix.is_empty() {
    hash
  } else {
    format!("{}_{}", prefix, hash)
  }
}

/// Strip everything but ASCII alphanumerics and `_`.
pub fn sanitize(component: &str) -> String {
  component.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect()
}

/// Split a resource logical name into its human part, dropping a trailing
/// unique-id hash (`hellodiff_test_15E428D2` becomes `hellodiff_test`).
pub fn strip_hash_suffix(name: &str) -> &str {
  match name.rsplit_once('_') {
    Some((human, suffix)) if !human.is_empty() && is_path_hash(suffix) => human,
    _ => name,
  }
}
