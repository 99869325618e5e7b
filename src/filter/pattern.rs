//! Literal-vs-regex pattern matchers.
//!
//! Trigger configuration doesn't distinguish literals from regexes
//! syntactically; a shared classifier decides once, at compile time, whether a
//! configured string is an exact-match literal or a regex. The decision is
//! baked into the [`Pattern`] variant and never re-inspected at match time.
//! The same classifier is applied to every pattern field (event types,
//! branches, refs, comments, emails, usernames, approval categories) so
//! behavior is consistent across fields.

use regex::Regex;
use std::fmt;

/// Bytes whose presence makes a configured string a regex rather than a
/// literal.
const REGEX_METACHARACTERS: &[u8] = b"^$*+?.()[]{}|\\";

/// Returns true if the configured string should be compiled as a regex.
pub fn looks_like_regex(source: &str) -> bool {
    source.bytes().any(|b| REGEX_METACHARACTERS.contains(&b))
}

/// A compiled pattern matcher: either an exact-match literal or a regex.
///
/// Each compiled filter owns its patterns; there is no process-wide regex
/// cache, so a reload can never observe state from a previous configuration.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// An exact string match.
    Literal(String),
    /// An unanchored regex match.
    Regex(Regex),
}

impl Pattern {
    /// Compiles a configured string into a pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error if the string was classified as a
    /// regex and its syntax is invalid. Literals cannot fail.
    pub fn compile(source: &str) -> Result<Pattern, regex::Error> {
        if looks_like_regex(source) {
            Regex::new(source).map(Pattern::Regex)
        } else {
            Ok(Pattern::Literal(source.to_owned()))
        }
    }

    /// Tests the pattern against a piece of event text.
    ///
    /// Literals require the whole text to be equal; regexes match anywhere in
    /// the text (configurations anchor with `^`/`$` when they mean the whole
    /// string). Matching is total: there is no runtime failure path.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Literal(literal) => literal == text,
            Pattern::Regex(regex) => regex.is_match(text),
        }
    }

    /// Returns the configured source string, as written.
    pub fn as_source(&self) -> &str {
        match self {
            Pattern::Literal(literal) => literal,
            Pattern::Regex(regex) => regex.as_str(),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pattern::Literal(a), Pattern::Literal(b)) => a == b,
            (Pattern::Regex(a), Pattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_source())
    }
}
