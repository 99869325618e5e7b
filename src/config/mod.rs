//! Trigger configuration: raw records, normalization, and diagnostics.
//!
//! Reading the configuration file and deciding whether accumulated errors
//! reject a reload both belong to the host application; this module only
//! defines the record shapes and the normalization pass that maps deprecated
//! key spellings onto canonical fields.

mod definition;
mod diagnostics;

pub use definition::{OneOrMany, RawApprovalPredicate, RawTriggerDef, RawValue, TriggerDef};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
