//! Core domain types shared across the crate.

mod ids;

pub use ids::{ChangeNumber, PatchsetNumber, RevisionId, TriggerUuid};
