//! Inbound Gerrit events.
//!
//! This module provides the typed event model consumed by the filter engine.
//! Producing these events from Gerrit's JSON stream is the source connector's
//! job and lives outside this crate.

mod event;

pub use event::{Account, Approval, ChangeInfo, EventType, GerritEvent};
