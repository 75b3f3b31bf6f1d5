//! Hashing utilities for path-derived identifiers.
//!
//! Unique ids for nodes deeper than the stack root carry a short hash of the
//! full node path, so two nodes whose sanitized components happen to collide
//! still end up with distinct logical names in the manifest.

use sha2::{Digest, Sha256};

use crate::consts::UNIQUE_ID_HASH_LEN;

/// Compute the short uppercase hex hash of a `/`-joined node path.
///
/// # Format
///
/// The hash is the first [`UNIQUE_ID_HASH_LEN`] characters of the uppercase
/// hexadecimal SHA-256 digest, e.g. `"15E428D2"`.
pub fn path_hash(components: &[&str]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(components.join("/").as_bytes());
  let full = hex::encode_upper(hasher.finalize());
  full[..UNIQUE_ID_HASH_LEN].to_string()
}

/// Returns true if `suffix` looks like a hash produced by [`path_hash`].
pub fn is_path_hash(suffix: &str) -> bool {
  suffix.len() == UNIQUE_ID_HASH_LEN && suffix.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}
