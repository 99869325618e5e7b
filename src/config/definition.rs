//! Raw trigger-definition records and their normalization.
//!
//! A trigger definition arrives as a permissive mapping parsed from the
//! configuration file (loading itself is out of scope). Two conventions from
//! the original configuration format are handled here so the rest of the
//! engine never sees them:
//!
//! - **Scalar-or-list**: every pattern-bearing key accepts either a single
//!   value or a list of values ([`OneOrMany`]).
//! - **Deprecated keys**: the legacy spellings `comment_filter`,
//!   `email_filter`, `username_filter`, `require-approval` and
//!   `reject-approval` are still accepted for backward compatibility.
//!   [`TriggerDef::normalize`] maps them onto the canonical fields and records
//!   a deprecation warning; if both spellings are present with different
//!   values, the canonical one wins and a conflict warning is recorded.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::diagnostics::Diagnostics;
use crate::types::TriggerUuid;

/// A configuration value that may be written as a scalar or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single value.
    One(T),
    /// A list of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flattens into a list; a scalar becomes a one-element list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// An approval value as written in configuration: a plain integer or a range
/// string such as `">=1"` or `"<=-1"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A plain integer vote value.
    Int(i64),
    /// A string form, either a bare integer or a `>=`/`<=` range.
    Str(String),
}

/// An approval predicate as written in configuration, used by the `require`
/// and `reject` keys. All fields are optional; a predicate with several fields
/// set requires all of them of the same approval.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawApprovalPredicate {
    /// The approval category, as a literal or regex pattern.
    #[serde(default)]
    pub category: Option<String>,

    /// The required vote value or range.
    #[serde(default)]
    pub value: Option<RawValue>,

    /// A pattern over the voter's username.
    #[serde(default)]
    pub username: Option<String>,

    /// A pattern over the voter's email address.
    #[serde(default)]
    pub email: Option<String>,

    /// Only approvals older than this age match, e.g. `"48h"` or `"2d"`.
    #[serde(default, rename = "older-than")]
    pub older_than: Option<String>,

    /// Only approvals newer than this age match.
    #[serde(default, rename = "newer-than")]
    pub newer_than: Option<String>,
}

/// A trigger definition exactly as parsed from configuration, deprecated keys
/// and all. [`TriggerDef::normalize`] turns this into the canonical form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTriggerDef {
    /// Event-type patterns.
    #[serde(default)]
    pub event: Option<OneOrMany<String>>,

    /// Branch patterns.
    #[serde(default)]
    pub branch: Option<OneOrMany<String>>,

    /// Ref patterns.
    #[serde(default, rename = "ref")]
    pub refs: Option<OneOrMany<String>>,

    /// Comment patterns (canonical key).
    #[serde(default)]
    pub comment: Option<OneOrMany<String>>,

    /// Comment patterns (deprecated key).
    #[serde(default)]
    pub comment_filter: Option<OneOrMany<String>>,

    /// Email patterns over the event actor (canonical key).
    #[serde(default)]
    pub email: Option<OneOrMany<String>>,

    /// Email patterns (deprecated key).
    #[serde(default)]
    pub email_filter: Option<OneOrMany<String>>,

    /// Username patterns over the event actor (canonical key).
    #[serde(default)]
    pub username: Option<OneOrMany<String>>,

    /// Username patterns (deprecated key).
    #[serde(default)]
    pub username_filter: Option<OneOrMany<String>>,

    /// Vote predicates over the triggering approval: category name (pattern)
    /// to required value. A list of single-entry mappings is equivalent to one
    /// merged mapping.
    #[serde(default)]
    pub approval: Option<OneOrMany<BTreeMap<String, RawValue>>>,

    /// Approval predicates that must all hold against the change's current
    /// approval snapshot (canonical key).
    #[serde(default)]
    pub require: Option<OneOrMany<RawApprovalPredicate>>,

    /// Require predicates (deprecated key).
    #[serde(default, rename = "require-approval")]
    pub require_approval: Option<OneOrMany<RawApprovalPredicate>>,

    /// Approval predicates none of which may hold against the snapshot
    /// (canonical key).
    #[serde(default)]
    pub reject: Option<OneOrMany<RawApprovalPredicate>>,

    /// Reject predicates (deprecated key).
    #[serde(default, rename = "reject-approval")]
    pub reject_approval: Option<OneOrMany<RawApprovalPredicate>>,

    /// Suppress matching on ref-deletion events. Defaults to true.
    #[serde(default, rename = "ignore-deletes")]
    pub ignore_deletes: Option<bool>,

    /// Opaque identifier attached to matches for downstream routing.
    #[serde(default)]
    pub uuid: Option<String>,

    /// Opaque routing scheme attached to matches.
    #[serde(default)]
    pub scheme: Option<String>,
}

/// A trigger definition in canonical form: deprecated keys resolved, scalars
/// flattened to lists, defaults applied. This is the only shape the filter
/// compiler consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDef {
    /// Event-type patterns; empty means any event type.
    pub event_types: Vec<String>,
    /// Branch patterns; empty means any branch.
    pub branches: Vec<String>,
    /// Ref patterns; empty means any ref.
    pub refs: Vec<String>,
    /// Comment patterns over the event comment text.
    pub comments: Vec<String>,
    /// Email patterns over the event actor.
    pub emails: Vec<String>,
    /// Username patterns over the event actor.
    pub usernames: Vec<String>,
    /// Vote predicates over the triggering approval: (category pattern,
    /// required value).
    pub approvals: Vec<(String, RawValue)>,
    /// Predicates that must all hold against the approval snapshot.
    pub require: Vec<RawApprovalPredicate>,
    /// Predicates none of which may hold against the snapshot.
    pub reject: Vec<RawApprovalPredicate>,
    /// Suppress matching on ref-deletion events.
    pub ignore_deletes: bool,
    /// Opaque identifier attached to matches.
    pub uuid: Option<TriggerUuid>,
    /// Opaque routing scheme attached to matches.
    pub scheme: Option<String>,
}

impl TriggerDef {
    /// Normalizes one raw definition.
    ///
    /// `index` is the definition's position in the configuration, used to
    /// build diagnostic paths like `triggers[3].comment`. Deprecation and
    /// conflict warnings go through `diags`; normalization itself never fails.
    pub fn normalize(index: usize, raw: &RawTriggerDef, diags: &mut Diagnostics) -> TriggerDef {
        let path = |key: &str| format!("triggers[{}].{}", index, key);

        let comments = resolve_alias(
            &path("comment"),
            "comment_filter",
            raw.comment.clone(),
            raw.comment_filter.clone(),
            diags,
        );
        let emails = resolve_alias(
            &path("email"),
            "email_filter",
            raw.email.clone(),
            raw.email_filter.clone(),
            diags,
        );
        let usernames = resolve_alias(
            &path("username"),
            "username_filter",
            raw.username.clone(),
            raw.username_filter.clone(),
            diags,
        );
        let require = resolve_alias(
            &path("require"),
            "require-approval",
            raw.require.clone(),
            raw.require_approval.clone(),
            diags,
        );
        let reject = resolve_alias(
            &path("reject"),
            "reject-approval",
            raw.reject.clone(),
            raw.reject_approval.clone(),
            diags,
        );

        let approvals = raw
            .approval
            .clone()
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect();

        TriggerDef {
            event_types: raw.event.clone().map(OneOrMany::into_vec).unwrap_or_default(),
            branches: raw.branch.clone().map(OneOrMany::into_vec).unwrap_or_default(),
            refs: raw.refs.clone().map(OneOrMany::into_vec).unwrap_or_default(),
            comments,
            emails,
            usernames,
            approvals,
            require,
            reject,
            ignore_deletes: raw.ignore_deletes.unwrap_or(true),
            uuid: raw.uuid.clone().map(TriggerUuid),
            scheme: raw.scheme.clone(),
        }
    }

    /// Normalizes a whole configuration, preserving definition order.
    pub fn normalize_all(raws: &[RawTriggerDef], diags: &mut Diagnostics) -> Vec<TriggerDef> {
        raws.iter()
            .enumerate()
            .map(|(index, raw)| TriggerDef::normalize(index, raw, diags))
            .collect()
    }
}

/// Resolves a canonical/deprecated key pair into one value.
///
/// Using the deprecated key records a deprecation warning but honors the
/// value. When both keys are present with different values, the canonical key
/// wins and a conflict warning is recorded.
fn resolve_alias<T: PartialEq>(
    canonical_path: &str,
    legacy_key: &str,
    canonical: Option<OneOrMany<T>>,
    legacy: Option<OneOrMany<T>>,
    diags: &mut Diagnostics,
) -> Vec<T> {
    match (canonical, legacy) {
        (None, None) => Vec::new(),
        (Some(value), None) => value.into_vec(),
        (None, Some(value)) => {
            diags.warn(
                canonical_path,
                format!("'{}' is deprecated, use the canonical key instead", legacy_key),
            );
            value.into_vec()
        }
        (Some(canonical), Some(legacy)) => {
            if canonical != legacy {
                diags.warn(
                    canonical_path,
                    format!(
                        "both canonical and deprecated '{}' are set with different values; \
                         the canonical value wins",
                        legacy_key
                    ),
                );
            } else {
                diags.warn(
                    canonical_path,
                    format!("'{}' is deprecated, use the canonical key instead", legacy_key),
                );
            }
            canonical.into_vec()
        }
    }
}
