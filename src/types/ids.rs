//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different identifiers (e.g., using
//! a patchset number where a change number is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Gerrit change number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeNumber(pub u64);

impl fmt::Display for ChangeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChangeNumber {
    fn from(n: u64) -> Self {
        ChangeNumber(n)
    }
}

/// A patchset number within a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchsetNumber(pub u32);

impl fmt::Display for PatchsetNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PatchsetNumber {
    fn from(n: u32) -> Self {
        PatchsetNumber(n)
    }
}

/// An opaque trigger identifier carried through from configuration to matched
/// events so the scheduler can route jobs back to the trigger that fired.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerUuid(pub String);

impl TriggerUuid {
    /// Creates a new TriggerUuid from a string.
    pub fn new(s: impl Into<String>) -> Self {
        TriggerUuid(s.into())
    }

    /// Returns the uuid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TriggerUuid {
    fn from(s: String) -> Self {
        TriggerUuid(s)
    }
}

/// A git revision id (40 hex characters).
///
/// Gerrit reports ref deletions as an update to the all-zero revision, so this
/// type knows how to recognize that sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(pub String);

impl RevisionId {
    /// Creates a new RevisionId from a string.
    ///
    /// Note: This does not validate the format. Valid revisions are 40 hex
    /// characters.
    pub fn new(s: impl Into<String>) -> Self {
        RevisionId(s.into())
    }

    /// Returns the revision as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the all-zero revision Gerrit uses to signal a
    /// ref deletion.
    pub fn is_zero(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b == b'0')
    }

    /// Returns a short (7-character) version of the revision for display.
    pub fn short(&self) -> &str {
        // Use get() to avoid panic if the string contains non-ASCII (shouldn't
        // happen for valid revisions, but can occur via new or Deserialize on
        // bad input).
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RevisionId {
    fn from(s: String) -> Self {
        RevisionId(s)
    }
}
