//! The event-filter engine.
//!
//! This module turns normalized trigger definitions into executable
//! [`CompiledFilter`]s and evaluates inbound events against them:
//!
//! - [`pattern`]: literal-vs-regex matchers, classified once at compile time
//! - [`approval`]: predicates over votes and the change's approval snapshot
//! - [`compiled`]: the per-definition filter and its match ladder
//! - [`engine`]: batch compilation, per-event evaluation, atomic reload

pub mod approval;
pub mod compiled;
pub mod engine;
pub mod pattern;

pub use approval::{ApprovalPredicate, PredicateError, ValueMatch, VotePredicate};
pub use compiled::CompiledFilter;
pub use engine::{compile, evaluate_all, evaluate_all_at, Evaluation, FilterSet};
pub use pattern::{looks_like_regex, Pattern};
