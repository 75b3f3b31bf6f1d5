//! tfstack-lib: synthesis and deploy core for tfstack
//!
//! - `node`: the configuration tree (stacks, containers, leaves)
//! - `synth`: tree-to-manifest compilation and the shared provider artifact
//! - `plan` / `engine`: plan parsing and the external execution engine
//! - `deploy`: the plan/diff/apply state machine
//! - `get`: provider binding generation

pub mod config;
pub mod consts;
pub mod deploy;
pub mod engine;
pub mod get;
pub mod merge;
pub mod node;
pub mod plan;
pub mod synth;
pub mod util;
