//! Trigger-filter engine for Gerrit-driven CI pipelines.
//!
//! This library decides, for an inbound Gerrit event, whether a pipeline
//! trigger should fire. A declarative trigger configuration is normalized
//! ([`config`]) and compiled into a list of executable filters ([`filter`]);
//! each inbound event ([`events`]) is then evaluated against every filter.
//! Any matching filter activates the pipeline, and the matched filters'
//! uuid/scheme metadata is handed back for downstream routing.
//!
//! Producing events from Gerrit's stream and consuming match decisions (the
//! scheduler) are the host application's job; this crate is the pure decision
//! logic in between.
//!
//! ```
//! use gerrit_trigger::config::{Diagnostics, RawTriggerDef, TriggerDef};
//! use gerrit_trigger::events::{EventType, GerritEvent};
//! use gerrit_trigger::filter;
//!
//! let raws: Vec<RawTriggerDef> = serde_json::from_str(
//!     r#"[{"event": "comment-added", "comment": "(?i)^recheck$"}]"#,
//! ).unwrap();
//!
//! let mut diags = Diagnostics::new();
//! let defs = TriggerDef::normalize_all(&raws, &mut diags);
//! let filters = filter::compile(&defs, &mut diags);
//! assert!(!diags.has_errors());
//!
//! let mut event = GerritEvent::new(EventType::CommentAdded);
//! event.comment = Some("recheck".to_owned());
//! assert!(filter::evaluate_all(&filters, &event).is_triggered());
//! ```

pub mod config;
pub mod events;
pub mod filter;
pub mod types;
