//! The executable form of a trigger definition.
//!
//! A [`CompiledFilter`] owns every compiled pattern it needs; patterns are
//! compiled once per configuration load and never recompiled on the hot path.
//! Evaluation is a pure predicate over the filter and the event: no shared
//! state, no mutation, no I/O. A filter list is therefore safe to share
//! read-only across any number of dispatch threads.

use chrono::{DateTime, Utc};
use tracing::trace;

use super::approval::{ApprovalPredicate, VotePredicate};
use super::pattern::Pattern;
use crate::config::{Diagnostics, RawApprovalPredicate, TriggerDef};
use crate::events::{EventType, GerritEvent};
use crate::types::TriggerUuid;

/// One trigger definition, compiled and ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    uuid: Option<TriggerUuid>,
    scheme: Option<String>,
    event_types: Vec<Pattern>,
    branches: Vec<Pattern>,
    refs: Vec<Pattern>,
    comments: Vec<Pattern>,
    emails: Vec<Pattern>,
    usernames: Vec<Pattern>,
    vote_predicates: Vec<VotePredicate>,
    require: Vec<ApprovalPredicate>,
    reject: Vec<ApprovalPredicate>,
    ignore_deletes: bool,
}

impl CompiledFilter {
    /// Compiles one canonical trigger definition.
    ///
    /// Every invalid pattern in the definition is reported through `diags`
    /// (with its configuration path), and a definition with any error is
    /// dropped entirely: a half-compiled filter could match more broadly than
    /// configured. Sibling definitions are unaffected.
    pub fn from_def(
        index: usize,
        def: &TriggerDef,
        diags: &mut Diagnostics,
    ) -> Option<CompiledFilter> {
        let mut failed = false;

        // Event-type patterns get extra validation: a literal that names no
        // known event type can never match and is a configuration mistake,
        // not a pattern that happens to be dormant.
        let mut event_types = Vec::with_capacity(def.event_types.len());
        for source in &def.event_types {
            match Pattern::compile(source) {
                Ok(Pattern::Literal(name))
                    if !EventType::ALL.iter().any(|t| t.as_str() == name) =>
                {
                    failed = true;
                    diags.error(
                        format!("triggers[{}].event", index),
                        format!("unknown event type '{}'", name),
                    );
                }
                Ok(pattern) => event_types.push(pattern),
                Err(err) => {
                    failed = true;
                    diags.error(
                        format!("triggers[{}].event", index),
                        format!("invalid pattern '{}': {}", source, err),
                    );
                }
            }
        }

        let mut compile_list = |key: &str, sources: &[String]| -> Vec<Pattern> {
            let mut patterns = Vec::with_capacity(sources.len());
            for source in sources {
                match Pattern::compile(source) {
                    Ok(pattern) => patterns.push(pattern),
                    Err(err) => {
                        failed = true;
                        diags.error(
                            format!("triggers[{}].{}", index, key),
                            format!("invalid pattern '{}': {}", source, err),
                        );
                    }
                }
            }
            patterns
        };

        let branches = compile_list("branch", &def.branches);
        let refs = compile_list("ref", &def.refs);
        let comments = compile_list("comment", &def.comments);
        let emails = compile_list("email", &def.emails);
        let usernames = compile_list("username", &def.usernames);

        let mut vote_predicates = Vec::with_capacity(def.approvals.len());
        for (category, value) in &def.approvals {
            match VotePredicate::compile(category, value) {
                Ok(predicate) => vote_predicates.push(predicate),
                Err(err) => {
                    failed = true;
                    diags.error(
                        format!("triggers[{}].approval['{}']", index, category),
                        err.to_string(),
                    );
                }
            }
        }

        let mut compile_predicates = |key: &str, raws: &[RawApprovalPredicate]| {
            let mut predicates = Vec::with_capacity(raws.len());
            for (i, raw) in raws.iter().enumerate() {
                match ApprovalPredicate::compile(raw) {
                    Ok(predicate) => predicates.push(predicate),
                    Err(err) => {
                        failed = true;
                        diags.error(format!("triggers[{}].{}[{}]", index, key, i), err.to_string());
                    }
                }
            }
            predicates
        };

        let require = compile_predicates("require", &def.require);
        let reject = compile_predicates("reject", &def.reject);

        if failed {
            return None;
        }

        Some(CompiledFilter {
            uuid: def.uuid.clone(),
            scheme: def.scheme.clone(),
            event_types,
            branches,
            refs,
            comments,
            emails,
            usernames,
            vote_predicates,
            require,
            reject,
            ignore_deletes: def.ignore_deletes,
        })
    }

    /// The opaque trigger identifier to attach to matched events.
    pub fn uuid(&self) -> Option<&TriggerUuid> {
        self.uuid.as_ref()
    }

    /// The opaque routing scheme to attach to matched events.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Evaluates the filter against an event at the current time.
    pub fn matches(&self, event: &GerritEvent) -> bool {
        self.matches_at(event, Utc::now())
    }

    /// Evaluates the filter against an event, using `now` for approval age
    /// predicates. Pure over its inputs.
    ///
    /// All steps are AND'ed and evaluated cheapest-first, short-circuiting on
    /// the first failure:
    ///
    /// 1. ref-deletion suppression (`ignore-deletes`), before any pattern work
    /// 2. event type (OR within the field)
    /// 3. branch (empty list means any branch)
    /// 4. ref, comment, email, username (same OR-within, AND-across semantics)
    /// 5. the triggering vote against the `approval` predicates
    /// 6. every `require` predicate against the approval snapshot
    /// 7. no `reject` predicate against the snapshot
    pub fn matches_at(&self, event: &GerritEvent, now: DateTime<Utc>) -> bool {
        match self.failing_step(event, now) {
            None => true,
            Some(step) => {
                trace!(
                    event = %event.describe(),
                    uuid = self.uuid.as_ref().map(TriggerUuid::as_str).unwrap_or("-"),
                    step,
                    "filter did not match"
                );
                false
            }
        }
    }

    /// Returns the name of the first failing step, or `None` on a match.
    fn failing_step(&self, event: &GerritEvent, now: DateTime<Utc>) -> Option<&'static str> {
        if self.ignore_deletes && event.is_ref_deletion() {
            return Some("ignore-deletes");
        }
        if !field_matches(&self.event_types, Some(event.event_type.as_str())) {
            return Some("event");
        }
        if !field_matches(&self.branches, event.branch()) {
            return Some("branch");
        }
        if !field_matches(&self.refs, event.ref_name.as_deref()) {
            return Some("ref");
        }
        if !field_matches(&self.comments, event.comment.as_deref()) {
            return Some("comment");
        }
        let account = event.account.as_ref();
        if !field_matches(&self.emails, account.and_then(|a| a.email.as_deref())) {
            return Some("email");
        }
        if !field_matches(&self.usernames, account.and_then(|a| a.username.as_deref())) {
            return Some("username");
        }
        if !self.vote_predicates.is_empty() {
            if let Some(vote) = &event.trigger_approval {
                if !self.vote_predicates.iter().any(|p| p.matches_vote(vote)) {
                    return Some("approval");
                }
            }
        }
        // The snapshot scans are the most expensive checks and run last.
        if !self.require.iter().all(|predicate| {
            event
                .approvals
                .iter()
                .any(|approval| predicate.is_satisfied_by(approval, now))
        }) {
            return Some("require");
        }
        if self.reject.iter().any(|predicate| {
            event
                .approvals
                .iter()
                .any(|approval| predicate.is_satisfied_by(approval, now))
        }) {
            return Some("reject");
        }
        None
    }
}

/// OR-within-field matching: an empty pattern list is a wildcard, and a
/// missing event field cannot satisfy a non-empty list.
fn field_matches(patterns: &[Pattern], text: Option<&str>) -> bool {
    if patterns.is_empty() {
        return true;
    }
    match text {
        Some(text) => patterns.iter().any(|p| p.matches(text)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawTriggerDef;
    use crate::events::{Account, Approval, ChangeInfo, EventType};
    use crate::types::{ChangeNumber, RevisionId};

    /// Compiles a filter from a JSON trigger definition, failing the test on
    /// any configuration error.
    fn filter(json: &str) -> CompiledFilter {
        let raw: RawTriggerDef = serde_json::from_str(json).unwrap();
        let mut diags = Diagnostics::new();
        let def = TriggerDef::normalize(0, &raw, &mut diags);
        let compiled = CompiledFilter::from_def(0, &def, &mut diags);
        assert!(!diags.has_errors(), "{:?}", diags.entries());
        compiled.unwrap()
    }

    fn change_event(event_type: EventType, branch: &str) -> GerritEvent {
        let mut event = GerritEvent::new(event_type);
        event.change = Some(ChangeInfo {
            project: "demo".into(),
            number: ChangeNumber(42),
            branch: branch.into(),
            patchset: None,
        });
        event
    }

    fn snapshot_vote(category: &str, value: i32, username: &str) -> Approval {
        Approval {
            category: category.into(),
            value,
            by: Account::with_username(username),
            granted_on: None,
        }
    }

    // ==================== Concrete scenarios ====================

    #[test]
    fn recheck_comment_matches() {
        let filter = filter(r#"{"event": "comment-added", "comment": "(?i)^recheck$"}"#);
        let mut event = change_event(EventType::CommentAdded, "master");
        event.comment = Some("recheck".into());
        assert!(filter.matches(&event));
    }

    #[test]
    fn branch_mismatch_does_not_match() {
        let filter = filter(r#"{"event": "patchset-created", "branch": "master"}"#);
        let event = change_event(EventType::PatchsetCreated, "feature/x");
        assert!(!filter.matches(&event));
    }

    #[test]
    fn ref_deletion_is_suppressed() {
        let filter = filter(r#"{"event": "ref-updated", "ignore-deletes": true}"#);
        let mut event = GerritEvent::new(EventType::RefUpdated);
        event.ref_name = Some("refs/heads/gone".into());
        event.new_rev = Some(RevisionId::new("0".repeat(40)));
        assert!(!filter.matches(&event));
    }

    #[test]
    fn require_by_username_scans_the_snapshot() {
        let filter = filter(r#"{"event": "change-merged", "require": [{"username": "ci-bot"}]}"#);

        let mut event = change_event(EventType::ChangeMerged, "master");
        event.approvals = vec![snapshot_vote("Verified", 1, "ci-bot")];
        assert!(filter.matches(&event));

        event.approvals = vec![snapshot_vote("Verified", 1, "someone-else")];
        assert!(!filter.matches(&event));
    }

    // ==================== Field semantics ====================

    #[test]
    fn empty_branch_list_is_a_wildcard() {
        let filter = filter(r#"{"event": "patchset-created"}"#);
        for branch in ["master", "feature/x", "weird branch name"] {
            assert!(filter.matches(&change_event(EventType::PatchsetCreated, branch)));
        }
    }

    #[test]
    fn event_type_is_or_within_field() {
        let filter = filter(r#"{"event": ["change-merged", "change-restored"]}"#);
        assert!(filter.matches(&change_event(EventType::ChangeMerged, "master")));
        assert!(filter.matches(&change_event(EventType::ChangeRestored, "master")));
        assert!(!filter.matches(&change_event(EventType::ChangeAbandoned, "master")));
    }

    #[test]
    fn event_type_can_be_a_regex() {
        let filter = filter(r#"{"event": "change-.*"}"#);
        assert!(filter.matches(&change_event(EventType::ChangeMerged, "master")));
        assert!(filter.matches(&change_event(EventType::ChangeAbandoned, "master")));
        assert!(!filter.matches(&change_event(EventType::CommentAdded, "master")));
    }

    #[test]
    fn fields_and_across_each_other() {
        let filter = filter(
            r#"{"event": "comment-added", "branch": "master", "comment": "^recheck$"}"#,
        );

        let mut event = change_event(EventType::CommentAdded, "master");
        event.comment = Some("recheck".into());
        assert!(filter.matches(&event));

        // Right comment, wrong branch.
        let mut event = change_event(EventType::CommentAdded, "develop");
        event.comment = Some("recheck".into());
        assert!(!filter.matches(&event));

        // Right branch, wrong comment.
        let mut event = change_event(EventType::CommentAdded, "master");
        event.comment = Some("lgtm".into());
        assert!(!filter.matches(&event));
    }

    #[test]
    fn missing_field_cannot_satisfy_a_pattern() {
        let filter = filter(r#"{"event": "comment-added", "comment": "^recheck$"}"#);
        // No comment text at all on the event.
        let event = change_event(EventType::CommentAdded, "master");
        assert!(!filter.matches(&event));
    }

    #[test]
    fn username_and_email_match_the_actor() {
        let filter = filter(r#"{"event": "comment-added", "username": "ci-.*"}"#);
        let mut event = change_event(EventType::CommentAdded, "master");

        event.account = Some(Account::with_username("ci-bot"));
        assert!(filter.matches(&event));

        event.account = Some(Account::with_username("alice"));
        assert!(!filter.matches(&event));

        event.account = None;
        assert!(!filter.matches(&event));
    }

    #[test]
    fn ref_patterns_match_ref_name() {
        let filter = filter(r#"{"event": "ref-updated", "ref": "refs/tags/.*"}"#);
        let mut event = GerritEvent::new(EventType::RefUpdated);
        event.ref_name = Some("refs/tags/v1.0".into());
        event.new_rev = Some(RevisionId::new("a94a8fe5ccb19ba61c4c0873d391e987982fbbd3"));
        assert!(filter.matches(&event));

        event.ref_name = Some("refs/heads/master".into());
        assert!(!filter.matches(&event));
    }

    // ==================== Delete suppression ====================

    #[test]
    fn deletion_short_circuit_has_absolute_priority() {
        // Every other field would match; the deletion check still wins.
        let filter = filter(r#"{"event": "ref-updated", "ref": "refs/heads/gone"}"#);
        let mut event = GerritEvent::new(EventType::RefUpdated);
        event.ref_name = Some("refs/heads/gone".into());
        event.new_rev = Some(RevisionId::new("0".repeat(40)));
        assert!(!filter.matches(&event));
    }

    #[test]
    fn deletions_match_when_ignore_deletes_is_off() {
        let filter = filter(r#"{"event": "ref-updated", "ignore-deletes": false}"#);
        let mut event = GerritEvent::new(EventType::RefUpdated);
        event.ref_name = Some("refs/heads/gone".into());
        event.new_rev = Some(RevisionId::new("0".repeat(40)));
        assert!(filter.matches(&event));
    }

    // ==================== Triggering vote ====================

    #[test]
    fn vote_predicates_test_the_triggering_vote() {
        let filter = filter(r#"{"event": "comment-added", "approval": {"Code-Review": 2}}"#);
        let mut event = change_event(EventType::CommentAdded, "master");

        event.trigger_approval = Some(Approval::new("Code-Review", 2));
        assert!(filter.matches(&event));

        event.trigger_approval = Some(Approval::new("Code-Review", 1));
        assert!(!filter.matches(&event));

        event.trigger_approval = Some(Approval::new("Verified", 2));
        assert!(!filter.matches(&event));
    }

    #[test]
    fn vote_predicates_are_skipped_without_a_triggering_vote() {
        let filter = filter(r#"{"event": "comment-added", "approval": {"Code-Review": 2}}"#);
        let event = change_event(EventType::CommentAdded, "master");
        assert!(filter.matches(&event));
    }

    // ==================== Require / reject ====================

    #[test]
    fn all_require_predicates_must_hold() {
        let filter = filter(
            r#"{"event": "comment-added",
                "require": [{"category": "Verified", "value": 1},
                            {"category": "Code-Review", "value": 2}]}"#,
        );
        let mut event = change_event(EventType::CommentAdded, "master");

        event.approvals = vec![
            snapshot_vote("Verified", 1, "ci-bot"),
            snapshot_vote("Code-Review", 2, "alice"),
        ];
        assert!(filter.matches(&event));

        // One of the two requirements missing from the snapshot.
        event.approvals = vec![snapshot_vote("Verified", 1, "ci-bot")];
        assert!(!filter.matches(&event));
    }

    #[test]
    fn reject_overrides_require() {
        let filter = filter(
            r#"{"event": "comment-added",
                "require": [{"category": "Verified", "value": 1}],
                "reject": [{"category": "Code-Review", "value": "<=-1"}]}"#,
        );
        let mut event = change_event(EventType::CommentAdded, "master");

        event.approvals = vec![snapshot_vote("Verified", 1, "ci-bot")];
        assert!(filter.matches(&event));

        // Requirement satisfied, but a rejecting vote is present.
        event.approvals = vec![
            snapshot_vote("Verified", 1, "ci-bot"),
            snapshot_vote("Code-Review", -2, "grumpy"),
        ];
        assert!(!filter.matches(&event));
    }

    #[test]
    fn require_is_independent_of_the_triggering_vote() {
        let filter = filter(
            r#"{"event": "comment-added", "require": [{"category": "Verified", "value": 1}]}"#,
        );
        let mut event = change_event(EventType::CommentAdded, "master");
        // The triggering vote is unrelated; the snapshot carries the
        // requirement.
        event.trigger_approval = Some(Approval::new("Code-Review", 1));
        event.approvals = vec![snapshot_vote("Verified", 1, "ci-bot")];
        assert!(filter.matches(&event));
    }

    // ==================== Compilation ====================

    #[test]
    fn uuid_and_scheme_are_exposed() {
        let filter = filter(r#"{"event": "change-merged", "uuid": "t-9", "scheme": "gate"}"#);
        assert_eq!(filter.uuid().map(TriggerUuid::as_str), Some("t-9"));
        assert_eq!(filter.scheme(), Some("gate"));
    }

    #[test]
    fn definition_with_bad_pattern_is_dropped_with_diagnostics() {
        let raw: RawTriggerDef =
            serde_json::from_str(r#"{"event": "comment-added", "comment": "[unclosed"}"#).unwrap();
        let mut diags = Diagnostics::new();
        let def = TriggerDef::normalize(3, &raw, &mut diags);
        let compiled = CompiledFilter::from_def(3, &def, &mut diags);

        assert!(compiled.is_none());
        assert!(diags.has_errors());
        assert_eq!(diags.entries()[0].path, "triggers[3].comment");
    }

    #[test]
    fn unknown_event_type_literal_is_a_config_error() {
        let raw: RawTriggerDef =
            serde_json::from_str(r#"{"event": "comment-aded"}"#).unwrap();
        let mut diags = Diagnostics::new();
        let def = TriggerDef::normalize(1, &raw, &mut diags);
        assert!(CompiledFilter::from_def(1, &def, &mut diags).is_none());
        assert!(diags.has_errors());
        assert_eq!(diags.entries()[0].path, "triggers[1].event");
        assert!(diags.entries()[0].message.contains("unknown event type"));
    }

    #[test]
    fn every_bad_pattern_in_a_definition_is_reported() {
        let raw: RawTriggerDef = serde_json::from_str(
            r#"{"branch": "[bad", "comment": "(also bad", "username": "ok"}"#,
        )
        .unwrap();
        let mut diags = Diagnostics::new();
        let def = TriggerDef::normalize(0, &raw, &mut diags);
        assert!(CompiledFilter::from_def(0, &def, &mut diags).is_none());
        assert_eq!(diags.entries().len(), 2);
    }
}
