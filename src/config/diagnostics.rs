//! Diagnostics accumulation for configuration processing.
//!
//! Configuration problems are accumulated rather than thrown: a malformed
//! pattern in one trigger definition must not abort processing of its
//! siblings, and deprecation warnings must surface without failing the load.
//! Whether accumulated errors ultimately reject the whole configuration is the
//! caller's policy, not this module's.

use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The configuration is still usable; the value was honored.
    /// E.g. use of a deprecated key name.
    Warning,

    /// The affected trigger definition is unusable and was dropped.
    /// E.g. a malformed regex.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A single configuration diagnostic: where it happened and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity of the problem.
    pub severity: Severity,

    /// The configuration path the problem was found at,
    /// e.g. `"triggers[2].branch"`.
    pub path: String,

    /// A human-readable description of the problem.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.path, self.message)
    }
}

/// An accumulator for configuration diagnostics.
///
/// Passed mutably through normalization and compilation; every non-fatal
/// problem ends up here instead of aborting the batch.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Records a warning.
    pub fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            path: path.into(),
            message: message.into(),
        });
    }

    /// Records an error.
    pub fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
        });
    }

    /// Returns true if any error-severity diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recorded diagnostics, in the order they were recorded.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Consumes the accumulator, yielding the recorded diagnostics.
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diags = Diagnostics::new();
        diags.warn("triggers[0].comment_filter", "deprecated key");
        assert!(!diags.has_errors());
        assert!(!diags.is_empty());
        assert_eq!(diags.entries().len(), 1);
    }

    #[test]
    fn errors_are_detected() {
        let mut diags = Diagnostics::new();
        diags.warn("triggers[0]", "something mild");
        diags.error("triggers[1].branch", "invalid regex");
        assert!(diags.has_errors());
        assert_eq!(diags.entries().len(), 2);
    }

    #[test]
    fn recording_order_is_preserved() {
        let mut diags = Diagnostics::new();
        diags.error("a", "first");
        diags.warn("b", "second");
        let entries = diags.into_entries();
        assert_eq!(entries[0].path, "a");
        assert_eq!(entries[1].path, "b");
    }

    #[test]
    fn display_includes_severity_path_and_message() {
        let mut diags = Diagnostics::new();
        diags.warn("triggers[3].email_filter", "deprecated key 'email_filter'");
        assert_eq!(
            diags.entries()[0].to_string(),
            "warning at triggers[3].email_filter: deprecated key 'email_filter'"
        );
    }
}
