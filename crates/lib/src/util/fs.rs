//! Atomic JSON file helpers.
//!
//! Artifacts are always written to a temporary sibling first, synced, and then
//! renamed over the destination, so a crash never leaves a half-written
//! document behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

// Unique temporary names within a process.
static NEXT_TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Serialize a JSON value the way every artifact is written: pretty-printed
/// with two-space indentation and a trailing newline.
pub fn to_pretty_json(value: &Value) -> Result<String, serde_json::Error> {
  let mut content = serde_json::to_string_pretty(value)?;
  content.push('\n');
  Ok(content)
}

/// Temporary path used while writing `path`.
fn temp_path_for(path: &Path) -> PathBuf {
  let n = NEXT_TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  path.with_file_name(format!("{}.tmp.{}.{}", name, std::process::id(), n))
}

/// Atomically replace `path` with `content`.
///
/// Uses write-then-rename; the temporary file is removed if any step fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
  let temp_path = temp_path_for(path);

  let result = (|| {
    let mut file = File::create(&temp_path)?;
    file.write_all(content)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)
  })();

  if result.is_err() {
    let _ = fs::remove_file(&temp_path);
  }
  result
}

/// Read a JSON document, returning `Ok(None)` when the file does not exist.
pub fn read_json_if_exists(path: &Path) -> io::Result<Option<Result<Value, serde_json::Error>>> {
  match fs::read_to_string(path) {
    Ok(content) => Ok(Some(serde_json::from_str(&content))),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e),
  }
}
