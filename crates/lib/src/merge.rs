//! Deep merge of nested JSON mappings.
//!
//! Used both to accumulate node fragments into one manifest document and to
//! merge a freshly synthesized provider document into the one already on disk.
//!
//! # Semantics
//!
//! - Two mappings merge key by key; keys present on one side only are copied
//!   through unchanged.
//! - When both sides hold a mapping for the same key, the merge recurses.
//! - Any other collision is right-biased: the incoming value replaces the base
//!   value. Arrays are replaced, never concatenated.
//!
//! Right-biased merging is not associative across three producers that set the
//! same scalar key, so callers must not rely on regrouping merges.

use serde_json::{Map, Value};
use tracing::debug;

/// Merge `incoming` into `base` and return the merged value.
///
/// An absent base is treated as an empty mapping. If `incoming` is not a
/// mapping it replaces the base outright.
pub fn deep_merge(base: Option<Value>, incoming: Value) -> Value {
  let base = base.unwrap_or_else(|| Value::Object(Map::new()));
  merge_value(base, incoming, &mut Vec::new())
}

/// Merge two mappings, consuming both.
pub fn deep_merge_maps(base: Map<String, Value>, incoming: Map<String, Value>) -> Map<String, Value> {
  merge_maps(base, incoming, &mut Vec::new())
}

fn merge_value(base: Value, incoming: Value, path: &mut Vec<String>) -> Value {
  match (base, incoming) {
    (Value::Object(base), Value::Object(incoming)) => Value::Object(merge_maps(base, incoming, path)),
    (base, incoming) => {
      if !path.is_empty() && base != incoming {
        debug!(key = %path.join("."), "merge conflict, incoming value replaces base");
      }
      incoming
    }
  }
}

fn merge_maps(mut base: Map<String, Value>, incoming: Map<String, Value>, path: &mut Vec<String>) -> Map<String, Value> {
  for (key, value) in incoming {
    let merged = match base.remove(&key) {
      Some(existing) => {
        path.push(key.clone());
        let merged = merge_value(existing, value, path);
        path.pop();
        merged
      }
      None => value,
    };
    base.insert(key, merged);
  }
  base
}
