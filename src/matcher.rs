//! Discriminant matching.
//!
//! A matcher decides whether a rule applies to an action by testing the
//! action's discriminant. Exact matchers compare strings; pattern matchers run
//! an unanchored regex search, so `DECR` matches `DECREMENT` unless the caller
//! anchors the pattern.

use std::fmt;

use regex::Regex;

use crate::error::{ListenerResult, ValidationError};

/// How a rule selects actions.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Discriminant must equal this string.
    Exact(String),
    /// Discriminant must contain a match of this regex.
    Pattern(Regex),
}

impl Matcher {
    /// Creates an exact matcher.
    #[must_use]
    pub fn exact(kind: impl Into<String>) -> Self {
        Self::Exact(kind.into())
    }

    /// Compiles an unanchored pattern matcher.
    pub fn pattern(source: &str) -> ListenerResult<Self> {
        compile(source).map(Self::Pattern)
    }

    /// Compiles a pattern matcher that must match the whole discriminant.
    pub fn anchored(source: &str) -> ListenerResult<Self> {
        if source.is_empty() {
            return Err(ValidationError::EmptyMatcher.into());
        }
        compile(&format!("^(?:{source})$")).map(Self::Pattern)
    }

    /// Tests a discriminant against this matcher.
    #[must_use]
    pub fn matches(&self, discriminant: &str) -> bool {
        match self {
            Self::Exact(kind) => kind == discriminant,
            Self::Pattern(re) => re.is_match(discriminant),
        }
    }

    /// Returns true for pattern matchers.
    #[must_use]
    pub const fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

fn compile(source: &str) -> ListenerResult<Regex> {
    Regex::new(source).map_err(|e| {
        ValidationError::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for Matcher {}

impl From<&str> for Matcher {
    fn from(kind: &str) -> Self {
        Self::Exact(kind.to_string())
    }
}

impl From<String> for Matcher {
    fn from(kind: String) -> Self {
        Self::Exact(kind)
    }
}

impl From<Regex> for Matcher {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(kind) => write!(f, "{kind}"),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_requires_equality() {
        let m = Matcher::from("INCREMENT");
        assert!(m.matches("INCREMENT"));
        assert!(!m.matches("INCREMENT_BY"));
        assert!(!m.matches("increment"));
    }

    #[test]
    fn pattern_is_unanchored_search() {
        let m = Matcher::pattern("CREM").unwrap();
        assert!(m.matches("INCREMENT"));
        assert!(m.matches("DECREMENT"));
        assert!(!m.matches("RESET"));
    }

    #[test]
    fn pattern_honors_caller_anchors() {
        let m = Matcher::pattern("^DECR").unwrap();
        assert!(m.matches("DECREMENT"));
        assert!(!m.matches("UNDECREMENT"));
    }

    #[test]
    fn anchored_requires_full_match() {
        let m = Matcher::anchored("INCR|DECR").unwrap();
        assert!(m.matches("INCR"));
        assert!(m.matches("DECR"));
        assert!(!m.matches("INCREMENT"));
    }

    #[test]
    fn invalid_pattern_is_validation_error() {
        let err = Matcher::pattern("(").unwrap_err();
        assert!(err.is_validation());

        let err = Matcher::anchored("").unwrap_err();
        assert!(matches!(
            err,
            crate::error::ListenerError::Validation(ValidationError::EmptyMatcher)
        ));
    }

    #[test]
    fn equality_and_display() {
        assert_eq!(Matcher::from("A"), Matcher::exact("A"));
        assert_eq!(Matcher::pattern("^A").unwrap(), Matcher::from(Regex::new("^A").unwrap()));
        assert_ne!(Matcher::from("^A"), Matcher::pattern("^A").unwrap());

        assert_eq!(Matcher::from("A").to_string(), "A");
        assert_eq!(Matcher::pattern("^A").unwrap().to_string(), "/^A/");
    }
}
