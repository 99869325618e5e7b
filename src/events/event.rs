//! Typed Gerrit event model.
//!
//! This module defines the typed representation of Gerrit stream events that
//! the filter engine evaluates. Events are produced by the upstream source
//! connector (SSH/REST polling, out of scope here) and are short-lived: one is
//! created per received event, evaluated against every compiled filter, and
//! discarded.
//!
//! Filters never mutate an event; evaluation is a pure predicate over it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ChangeNumber, PatchsetNumber, RevisionId};

/// The kind of a Gerrit stream event.
///
/// This is a closed enum over the event types Gerrit emits; the wire names
/// (kebab-case) are what trigger configurations match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// A new patchset was uploaded to a change.
    PatchsetCreated,
    /// A draft change was published.
    DraftPublished,
    /// A change was abandoned.
    ChangeAbandoned,
    /// An abandoned change was restored.
    ChangeRestored,
    /// A change was submitted and merged.
    ChangeMerged,
    /// A review comment (possibly carrying votes) was added.
    CommentAdded,
    /// A ref was updated directly (push, tag, deletion).
    RefUpdated,
    /// A pending check was scheduled (checks plugin).
    PendingCheck,
    /// A vote was removed from a change.
    VoteDeleted,
    /// A change entered or left work-in-progress state.
    WipStateChanged,
}

impl EventType {
    /// Every event type, in wire order. Used to validate configured
    /// event-type literals at filter compile time.
    pub const ALL: [EventType; 10] = [
        EventType::PatchsetCreated,
        EventType::DraftPublished,
        EventType::ChangeAbandoned,
        EventType::ChangeRestored,
        EventType::ChangeMerged,
        EventType::CommentAdded,
        EventType::RefUpdated,
        EventType::PendingCheck,
        EventType::VoteDeleted,
        EventType::WipStateChanged,
    ];

    /// Returns the wire name of this event type, as it appears in Gerrit's
    /// JSON stream and in trigger configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PatchsetCreated => "patchset-created",
            EventType::DraftPublished => "draft-published",
            EventType::ChangeAbandoned => "change-abandoned",
            EventType::ChangeRestored => "change-restored",
            EventType::ChangeMerged => "change-merged",
            EventType::CommentAdded => "comment-added",
            EventType::RefUpdated => "ref-updated",
            EventType::PendingCheck => "pending-check",
            EventType::VoteDeleted => "vote-deleted",
            EventType::WipStateChanged => "wip-state-changed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Gerrit account: the actor behind an event or the voter behind an
/// approval.
///
/// Gerrit omits fields it doesn't know (service users without an email,
/// events with no associated account at all), so both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account's username, if set.
    #[serde(default)]
    pub username: Option<String>,

    /// The account's email address, if set.
    #[serde(default)]
    pub email: Option<String>,
}

impl Account {
    /// Creates an account with just a username, the common case in tests and
    /// for service users.
    pub fn with_username(username: impl Into<String>) -> Self {
        Account {
            username: Some(username.into()),
            email: None,
        }
    }
}

/// A single approval vote on a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// The approval category, e.g. "Code-Review" or "Verified".
    pub category: String,

    /// The vote value, e.g. -2..=+2 for Code-Review.
    pub value: i32,

    /// The account that cast this vote.
    #[serde(default)]
    pub by: Account,

    /// When the vote was granted. Used by age predicates; absent when the
    /// source connector could not determine it.
    #[serde(default)]
    pub granted_on: Option<DateTime<Utc>>,
}

impl Approval {
    /// Creates an approval with no voter identity or timestamp.
    pub fn new(category: impl Into<String>, value: i32) -> Self {
        Approval {
            category: category.into(),
            value,
            by: Account::default(),
            granted_on: None,
        }
    }
}

/// Metadata about the change an event belongs to.
///
/// Ref-level events (`ref-updated`) have no associated change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// The project the change belongs to.
    pub project: String,

    /// The change number.
    pub number: ChangeNumber,

    /// The destination branch of the change.
    pub branch: String,

    /// The patchset the event refers to, when applicable.
    #[serde(default)]
    pub patchset: Option<PatchsetNumber>,
}

/// An inbound Gerrit event, as handed to the filter engine by the source
/// connector.
///
/// Fields are optional where the corresponding Gerrit event kind doesn't carry
/// them: `ref-updated` has no change, `patchset-created` has no comment, only
/// `comment-added` carries a triggering vote, and so on. The filter engine
/// treats a missing field as "cannot satisfy a pattern over it".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GerritEvent {
    /// The kind of event.
    pub event_type: EventType,

    /// The change this event belongs to, absent for ref-level events.
    #[serde(default)]
    pub change: Option<ChangeInfo>,

    /// The ref the event refers to (e.g. "refs/heads/master").
    #[serde(default)]
    pub ref_name: Option<String>,

    /// The previous revision of the ref, for `ref-updated`.
    #[serde(default)]
    pub old_rev: Option<RevisionId>,

    /// The new revision of the ref, for `ref-updated`. The all-zero revision
    /// signals a ref deletion.
    #[serde(default)]
    pub new_rev: Option<RevisionId>,

    /// The account that caused the event.
    #[serde(default)]
    pub account: Option<Account>,

    /// The comment text, for `comment-added`. May be empty.
    #[serde(default)]
    pub comment: Option<String>,

    /// The single approval vote that caused this event, for `comment-added`.
    #[serde(default)]
    pub trigger_approval: Option<Approval>,

    /// The full current set of approvals on the change, independent of which
    /// vote triggered the event. Require/reject predicates evaluate against
    /// this snapshot.
    #[serde(default)]
    pub approvals: Vec<Approval>,
}

impl GerritEvent {
    /// Creates an event of the given type with every optional field unset.
    pub fn new(event_type: EventType) -> Self {
        GerritEvent {
            event_type,
            change: None,
            ref_name: None,
            old_rev: None,
            new_rev: None,
            account: None,
            comment: None,
            trigger_approval: None,
            approvals: Vec::new(),
        }
    }

    /// Returns true if this event represents a ref deletion (the new revision
    /// is the all-zero sentinel).
    pub fn is_ref_deletion(&self) -> bool {
        self.new_rev.as_ref().is_some_and(RevisionId::is_zero)
    }

    /// Returns the destination branch, if the event has an associated change.
    pub fn branch(&self) -> Option<&str> {
        self.change.as_ref().map(|c| c.branch.as_str())
    }

    /// A short human-readable identity for log messages, e.g.
    /// `"comment-added on project/42"` or `"ref-updated on refs/heads/x"`.
    pub fn describe(&self) -> String {
        match (&self.change, &self.ref_name) {
            (Some(change), _) => {
                format!("{} on {}/{}", self.event_type, change.project, change.number)
            }
            (None, Some(ref_name)) => format!("{} on {}", self.event_type, ref_name),
            (None, None) => self.event_type.to_string(),
        }
    }
}
