//! Pattern types for expect operations.
//!
//! Patterns are matched against raw terminal bytes so that offsets line up
//! with the session output even when the child emits invalid UTF-8.

use std::fmt;

use regex::bytes::Regex;

use crate::error::{ExpectError, Result};

/// A pattern that can be matched against terminal output.
#[derive(Clone)]
pub enum Pattern {
    /// Match an exact string.
    Literal(String),

    /// Match a regular expression.
    Regex(CompiledRegex),
}

impl Pattern {
    /// Create a literal pattern.
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// Create a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::InvalidPattern`] if the regex does not compile.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| ExpectError::InvalidPattern {
            message: e.to_string(),
        })?;
        Ok(Self::Regex(CompiledRegex::new(pattern.to_string(), regex)))
    }

    /// Get the pattern as a string for display purposes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(r) => r.pattern(),
        }
    }

    /// Find the leftmost occurrence of this pattern in `haystack`.
    ///
    /// Offsets in the result are relative to `haystack`.
    #[must_use]
    pub fn find(&self, haystack: &[u8]) -> Option<PatternMatch> {
        match self {
            Self::Literal(s) => find_bytes(haystack, s.as_bytes()).map(|pos| PatternMatch {
                start: pos,
                end: pos + s.len(),
                captures: Vec::new(),
            }),
            Self::Regex(r) => r.find(haystack),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.pattern()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl From<&String> for Pattern {
    fn from(s: &String) -> Self {
        Self::Literal(s.clone())
    }
}

/// A compiled regular expression with its source pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    pattern: String,
    regex: Regex,
}

impl CompiledRegex {
    /// Create a new compiled regex.
    #[must_use]
    pub const fn new(pattern: String, regex: Regex) -> Self {
        Self { pattern, regex }
    }

    /// Get the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn find(&self, haystack: &[u8]) -> Option<PatternMatch> {
        let caps = self.regex.captures(haystack)?;
        let whole = caps.get(0)?;
        let captures = caps
            .iter()
            .skip(1)
            .map(|m| m.map_or_else(String::new, |m| String::from_utf8_lossy(m.as_bytes()).into_owned()))
            .collect();

        Some(PatternMatch {
            start: whole.start(),
            end: whole.end(),
            captures,
        })
    }
}

/// Result of a successful pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Start offset of the match.
    pub start: usize,
    /// End offset of the match (exclusive).
    pub end: usize,
    /// Capture groups, excluding the whole match.
    pub captures: Vec<String>,
}

/// Leftmost occurrence of `needle` in `haystack`. An empty needle matches at 0.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
