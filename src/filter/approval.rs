//! Approval predicates.
//!
//! Two kinds of predicate are compiled from configuration:
//!
//! - [`VotePredicate`] tests the single vote that *caused* a comment-added
//!   event (the `approval` configuration key).
//! - [`ApprovalPredicate`] tests approvals in the change's *current* snapshot,
//!   independent of the triggering vote (the `require` / `reject` keys). It
//!   can constrain the category, the value, the voter's identity, and the
//!   vote's age.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::pattern::Pattern;
use crate::config::{RawApprovalPredicate, RawValue};
use crate::events::Approval;

/// Errors that can occur when compiling an approval predicate.
#[derive(Debug, Error)]
pub enum PredicateError {
    /// The value is not an integer or a `>=`/`<=` range string.
    #[error("invalid approval value '{value}'")]
    InvalidValue { value: String },

    /// The age string is not of the form `<n><d|h|m|s>`, e.g. "48h".
    #[error("invalid age '{value}', expected e.g. '2d', '48h', '30m' or '10s'")]
    InvalidAge { value: String },

    /// A pattern field failed to compile as a regex.
    #[error("invalid pattern in '{field}'")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// A constraint on an approval's vote value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMatch {
    /// Any value is acceptable.
    Any,
    /// The value must equal this exactly.
    Exact(i32),
    /// The value must be at least this (`">=n"`).
    AtLeast(i32),
    /// The value must be at most this (`"<=n"`).
    AtMost(i32),
}

impl ValueMatch {
    /// Parses a configured value: a plain integer, or a string that is either
    /// a bare integer or a `>=`/`<=` range.
    pub fn parse(raw: &RawValue) -> Result<ValueMatch, PredicateError> {
        match raw {
            RawValue::Int(n) => i32::try_from(*n)
                .map(ValueMatch::Exact)
                .map_err(|_| PredicateError::InvalidValue {
                    value: n.to_string(),
                }),
            RawValue::Str(s) => {
                let trimmed = s.trim();
                let invalid = || PredicateError::InvalidValue { value: s.clone() };
                if let Some(rest) = trimmed.strip_prefix(">=") {
                    rest.trim().parse().map(ValueMatch::AtLeast).map_err(|_| invalid())
                } else if let Some(rest) = trimmed.strip_prefix("<=") {
                    rest.trim().parse().map(ValueMatch::AtMost).map_err(|_| invalid())
                } else {
                    trimmed.parse().map(ValueMatch::Exact).map_err(|_| invalid())
                }
            }
        }
    }

    /// Tests a vote value against this constraint.
    pub fn matches(&self, value: i32) -> bool {
        match self {
            ValueMatch::Any => true,
            ValueMatch::Exact(n) => value == *n,
            ValueMatch::AtLeast(n) => value >= *n,
            ValueMatch::AtMost(n) => value <= *n,
        }
    }
}

/// Parses an age string of the form `<n><unit>` where unit is one of
/// `d`, `h`, `m`, `s`.
pub fn parse_age(source: &str) -> Result<Duration, PredicateError> {
    let invalid = || PredicateError::InvalidAge {
        value: source.to_owned(),
    };
    let trimmed = source.trim();
    let unit = trimmed.chars().next_back().ok_or_else(invalid)?;
    let amount: i64 = trimmed[..trimmed.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }
    // The fallible constructors reject amounts chrono cannot represent; a
    // config-supplied age must surface as a diagnostic, never a panic.
    match unit {
        'd' => Duration::try_days(amount).ok_or_else(invalid),
        'h' => Duration::try_hours(amount).ok_or_else(invalid),
        'm' => Duration::try_minutes(amount).ok_or_else(invalid),
        's' => Duration::try_seconds(amount).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// A predicate over the triggering vote of a comment-added event: the
/// category (literal or regex) and the required value.
#[derive(Debug, Clone, PartialEq)]
pub struct VotePredicate {
    /// Pattern over the approval category name.
    pub category: Pattern,
    /// Constraint on the vote value.
    pub value: ValueMatch,
}

impl VotePredicate {
    /// Compiles a (category pattern, raw value) configuration entry.
    pub fn compile(category: &str, value: &RawValue) -> Result<VotePredicate, PredicateError> {
        Ok(VotePredicate {
            category: Pattern::compile(category).map_err(|source| {
                PredicateError::InvalidPattern {
                    field: "approval",
                    source,
                }
            })?,
            value: ValueMatch::parse(value)?,
        })
    }

    /// Tests the triggering vote against this predicate.
    pub fn matches_vote(&self, vote: &Approval) -> bool {
        self.category.matches(&vote.category) && self.value.matches(vote.value)
    }
}

/// A predicate over the change's current approval snapshot, used by `require`
/// and `reject`. Every set field must hold of the same approval.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalPredicate {
    /// Pattern over the approval category, if constrained.
    pub category: Option<Pattern>,
    /// Constraint on the vote value.
    pub value: ValueMatch,
    /// Pattern over the voter's username, if constrained.
    pub username: Option<Pattern>,
    /// Pattern over the voter's email, if constrained.
    pub email: Option<Pattern>,
    /// Only approvals older than this match, if set.
    pub older_than: Option<Duration>,
    /// Only approvals newer than this match, if set.
    pub newer_than: Option<Duration>,
}

impl ApprovalPredicate {
    /// Compiles a raw require/reject predicate.
    pub fn compile(raw: &RawApprovalPredicate) -> Result<ApprovalPredicate, PredicateError> {
        let compile_field = |field: &'static str, source: &Option<String>| {
            source
                .as_deref()
                .map(Pattern::compile)
                .transpose()
                .map_err(|source| PredicateError::InvalidPattern { field, source })
        };

        Ok(ApprovalPredicate {
            category: compile_field("category", &raw.category)?,
            value: raw
                .value
                .as_ref()
                .map(ValueMatch::parse)
                .transpose()?
                .unwrap_or(ValueMatch::Any),
            username: compile_field("username", &raw.username)?,
            email: compile_field("email", &raw.email)?,
            older_than: raw.older_than.as_deref().map(parse_age).transpose()?,
            newer_than: raw.newer_than.as_deref().map(parse_age).transpose()?,
        })
    }

    /// Tests one approval from the snapshot against this predicate.
    ///
    /// An identity or age constraint that the approval cannot answer (voter
    /// without a username, vote without a timestamp) fails the predicate
    /// rather than passing it.
    pub fn is_satisfied_by(&self, approval: &Approval, now: DateTime<Utc>) -> bool {
        if let Some(category) = &self.category {
            if !category.matches(&approval.category) {
                return false;
            }
        }
        if !self.value.matches(approval.value) {
            return false;
        }
        if let Some(username) = &self.username {
            match &approval.by.username {
                Some(actual) if username.matches(actual) => {}
                _ => return false,
            }
        }
        if let Some(email) = &self.email {
            match &approval.by.email {
                Some(actual) if email.matches(actual) => {}
                _ => return false,
            }
        }
        if self.older_than.is_some() || self.newer_than.is_some() {
            let Some(granted_on) = approval.granted_on else {
                return false;
            };
            let age = now - granted_on;
            if let Some(older_than) = self.older_than {
                if age <= older_than {
                    return false;
                }
            }
            if let Some(newer_than) = self.newer_than {
                if age >= newer_than {
                    return false;
                }
            }
        }
        true
    }
}
