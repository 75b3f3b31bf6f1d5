//! Manifest synthesis.
//!
//! Walks a [`Stack`] in pre-order, merges every node's fragment into one
//! document, splits the `provider` section off and persists two artifacts:
//!
//! ```text
//! {out_dir}/
//! ├── <stack unique id>.tf.json   # manifest, rewritten on every synthesis
//! ├── providers.tf.json           # shared, merged with its previous content
//! └── .providers.lock             # guards providers.tf.json
//! ```

mod lock;
mod types;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::consts::{MANIFEST_EXTENSION, PROVIDER_FILENAME, PROVIDER_KEY};
use crate::merge::{deep_merge, deep_merge_maps};
use crate::node::{App, Fragment, Stack};
use crate::util::fs::{read_json_if_exists, to_pretty_json, write_atomic};

pub use lock::{LockMetadata, ProviderLock, ProviderLockError};
pub use types::{SynthError, SynthOutput};

/// Merge the fragments of every node of `stack` in pre-order.
///
/// Later-visited nodes win on conflicting scalar keys.
pub fn to_document(stack: &Stack) -> Fragment {
  let mut document = Fragment::new();
  stack.walk(|visited| {
    if let Some(element) = &visited.node.element {
      let fragment = element.to_fragment(&visited.unique_id());
      document = deep_merge_maps(std::mem::take(&mut document), fragment);
    }
  });
  document
}

/// Remove the provider section from a document.
///
/// Returns the remaining manifest and the provider value, if any.
pub fn split_provider(mut document: Fragment) -> (Fragment, Option<Value>) {
  let provider = document.remove(PROVIDER_KEY);
  (document, provider)
}

/// Path of the manifest artifact for a stack.
pub fn manifest_path(stack: &Stack, out_dir: &Path) -> PathBuf {
  out_dir.join(format!("{}{}", stack.unique_id(), MANIFEST_EXTENSION))
}

/// Path of the provider artifact shared by an output directory.
pub fn provider_path(out_dir: &Path) -> PathBuf {
  out_dir.join(PROVIDER_FILENAME)
}

/// Synthesize one stack into `out_dir`.
///
/// The manifest is written atomically to a path derived from the stack's
/// unique id. The provider section is merged into the shared provider
/// artifact while holding the output directory's provider lock.
pub fn synthesize(stack: &Stack, out_dir: &Path) -> Result<SynthOutput, SynthError> {
  stack.validate()?;

  fs::create_dir_all(out_dir).map_err(|source| SynthError::CreateDir {
    path: out_dir.to_path_buf(),
    source,
  })?;

  let (manifest, provider) = split_provider(to_document(stack));
  let manifest = Value::Object(manifest);

  let manifest_path = manifest_path(stack, out_dir);
  write_document(&manifest_path, &manifest)?;
  debug!(stack = %stack.name, path = %manifest_path.display(), "wrote manifest");

  let provider_path = provider_path(out_dir);
  merge_provider(out_dir, &provider_path, &stack.name, provider)?;

  info!(stack = %stack.name, out_dir = %out_dir.display(), "synthesized stack");

  Ok(SynthOutput {
    stack_name: stack.name.clone(),
    stack_id: stack.unique_id(),
    manifest_path,
    provider_path,
    manifest,
  })
}

/// Synthesize every stack of an app, in declaration order.
pub fn synthesize_app(app: &App, out_dir: &Path) -> Result<Vec<SynthOutput>, SynthError> {
  app.validate()?;
  app.stacks.iter().map(|stack| synthesize(stack, out_dir)).collect()
}

fn write_document(path: &Path, document: &Value) -> Result<(), SynthError> {
  let content = to_pretty_json(document).map_err(SynthError::Serialize)?;
  write_atomic(path, content.as_bytes()).map_err(|source| SynthError::Write {
    path: path.to_path_buf(),
    source,
  })
}

/// Read-merge-write of the provider artifact as one critical section.
fn merge_provider(out_dir: &Path, path: &Path, stack: &str, provider: Option<Value>) -> Result<(), SynthError> {
  let _lock = ProviderLock::acquire(out_dir, stack)?;

  let existing = match read_json_if_exists(path).map_err(|source| SynthError::Read {
    path: path.to_path_buf(),
    source,
  })? {
    Some(parsed) => Some(parsed.map_err(|source| SynthError::Parse {
      path: path.to_path_buf(),
      source,
    })?),
    None => None,
  };

  let candidate = match provider {
    Some(provider) => json!({ PROVIDER_KEY: provider }),
    None => Value::Object(Map::new()),
  };

  let merged = match existing {
    Some(existing) => deep_merge(Some(existing), candidate),
    None => candidate,
  };

  write_document(path, &merged)?;
  debug!(stack, path = %path.display(), "merged provider artifact");
  Ok(())
}
