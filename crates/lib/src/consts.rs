//! Shared constants for tfstack.

/// Suffix of every per-stack manifest artifact.
pub const MANIFEST_EXTENSION: &str = ".tf.json";

/// File name of the provider artifact shared by all stacks in an output directory.
pub const PROVIDER_FILENAME: &str = "providers.tf.json";

/// Lock file guarding read-merge-write of the provider artifact.
pub const PROVIDER_LOCK_FILENAME: &str = ".providers.lock";

/// Reserved top-level manifest key that is split into the provider artifact.
pub const PROVIDER_KEY: &str = "provider";

/// Number of uppercase hex characters appended to multi-component unique ids.
pub const UNIQUE_ID_HASH_LEN: usize = 8;

/// Upper bound on the length of a unique id.
pub const UNIQUE_ID_MAX_LEN: usize = 255;

/// Path component hidden from unique ids.
pub const HIDDEN_NODE_ID: &str = "Default";

/// Name of the plan artifact written by the engine inside a stack directory.
pub const PLAN_FILENAME: &str = "plan";

/// Project configuration file name.
pub const CONFIG_FILENAME: &str = "tfstack.json";

/// Directory under the output directory holding one engine working directory per stack.
pub const STACKS_DIR: &str = "stacks";

/// Stack unique ids whose artifacts would collide with the shared provider
/// artifact or the engine working directories. Compared case-insensitively.
pub const RESERVED_STACK_IDS: &[&str] = &["providers", "stacks"];
