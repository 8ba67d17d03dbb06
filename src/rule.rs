//! Match rules and action transforms.

use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::error::ListenerResult;
use crate::matcher::Matcher;

type TransformFn = dyn Fn(Action) -> ListenerResult<Action> + Send + Sync;

/// Rewrites the private copy of an action before a runner sees it.
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    /// Returns the action unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self::map(|action| action)
    }

    /// Wraps a fallible transform.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Action) -> ListenerResult<Action> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wraps an infallible transform.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(Action) -> Action + Send + Sync + 'static,
    {
        Self(Arc::new(move |action: Action| -> ListenerResult<Action> {
            Ok(f(action))
        }))
    }

    /// Applies the transform.
    pub fn apply(&self, action: Action) -> ListenerResult<Action> {
        (self.0)(action)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// A matcher paired with a transform. Immutable once built.
#[derive(Debug, Clone)]
pub struct Rule {
    matcher: Matcher,
    transform: Transform,
}

impl Rule {
    /// Creates a rule with the identity transform.
    #[must_use]
    pub fn new(matcher: impl Into<Matcher>) -> Self {
        Self::with_transform(matcher, Transform::identity())
    }

    /// Creates a rule with a custom transform.
    #[must_use]
    pub fn with_transform(matcher: impl Into<Matcher>, transform: Transform) -> Self {
        Self {
            matcher: matcher.into(),
            transform,
        }
    }

    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    #[must_use]
    pub fn matches(&self, discriminant: &str) -> bool {
        self.matcher.matches(discriminant)
    }

    /// Transforms a copy of `action`; the original is never touched.
    pub fn apply(&self, action: &Action) -> ListenerResult<Action> {
        self.transform.apply(action.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use serde_json::json;

    #[test]
    fn default_transform_is_identity() {
        let rule = Rule::new("INCREMENT");
        let action = Action::new("INCREMENT");
        assert_eq!(rule.apply(&action).unwrap(), action);
    }

    #[test]
    fn apply_leaves_original_untouched() {
        let rule = Rule::with_transform(
            "INCREMENT",
            Transform::map(|mut action| {
                action.set_payload(json!({ "foo": "bar" }));
                action
            }),
        );
        let original = Action::new("INCREMENT");

        let transformed = rule.apply(&original).unwrap();

        assert_eq!(transformed.payload(), Some(&json!({ "foo": "bar" })));
        assert!(original.payload().is_none());
    }

    #[test]
    fn fallible_transform_propagates() {
        let rule = Rule::with_transform(
            "INCREMENT",
            Transform::new(|_| Err(ListenerError::callback("bad payload"))),
        );
        let err = rule.apply(&Action::new("INCREMENT")).unwrap_err();
        assert!(err.is_callback());
    }

    #[test]
    fn matches_delegates_to_matcher() {
        let rule = Rule::new(Matcher::pattern("^DECR").unwrap());
        assert!(rule.matches("DECREMENT"));
        assert!(!rule.matches("INCREMENT"));
        assert!(rule.matcher().is_pattern());
    }
}
