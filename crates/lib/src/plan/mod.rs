//! Plan model and plan output parsing.
//!
//! A [`PlanSummary`] is the classified list of resource actions the engine
//! intends to take for one stack. Every resource carries exactly one of the
//! four [`PlannedResourceAction`]s.

mod parse;
mod types;

pub use parse::{PlanParseError, classify_actions, parse_plan_json, parse_remote_url};
pub use types::{ActionCounts, PlanSummary, PlannedResource, PlannedResourceAction};
