//! Listeners: a runner bound to an append-only list of rules.
//!
//! A [`Listener`] is a cheap handle. Clones share the same rules, so a listener
//! that has already been registered can still gain rules and the registry sees
//! them on the next dispatch.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::Action;
use crate::error::ListenerResult;
use crate::matcher::Matcher;
use crate::middleware::Dispatch;
use crate::rule::{Rule, Transform};

/// Unique identifier for a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Create a new random listener id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type RunnerFn = dyn Fn(Action, &Dispatch) -> ListenerResult<()> + Send + Sync;

/// Callback invoked once per matching rule.
#[derive(Clone)]
pub struct Runner(Arc<RunnerFn>);

impl Runner {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Action, &Dispatch) -> ListenerResult<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn run(&self, action: Action, dispatch: &Dispatch) -> ListenerResult<()> {
        (self.0)(action, dispatch)
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Runner(..)")
    }
}

#[derive(Debug)]
struct ListenerInner {
    id: ListenerId,
    name: Option<String>,
    runner: Runner,
    rules: RwLock<Vec<Rule>>,
}

/// A runner plus the rules that trigger it.
///
/// # Examples
///
/// ```
/// use action_listeners::{Listener, Matcher};
///
/// let listener = Listener::from_fn(|action, _dispatch| {
///     println!("saw {action}");
/// });
/// listener
///     .add_rule("INCREMENT")
///     .add_rule(Matcher::pattern("^DECR").unwrap());
///
/// assert_eq!(listener.rule_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Listener {
    inner: Arc<ListenerInner>,
}

impl Listener {
    /// Creates a listener around a fallible runner.
    pub fn new<F>(runner: F) -> Self
    where
        F: Fn(Action, &Dispatch) -> ListenerResult<()> + Send + Sync + 'static,
    {
        Self::build(None, Runner::new(runner))
    }

    /// Creates a listener around a runner that cannot fail.
    pub fn from_fn<F>(runner: F) -> Self
    where
        F: Fn(Action, &Dispatch) + Send + Sync + 'static,
    {
        Self::new(move |action, dispatch| {
            runner(action, dispatch);
            Ok(())
        })
    }

    /// Creates a named listener. The name only shows up in logs.
    pub fn named<F>(name: impl Into<String>, runner: F) -> Self
    where
        F: Fn(Action, &Dispatch) -> ListenerResult<()> + Send + Sync + 'static,
    {
        Self::build(Some(name.into()), Runner::new(runner))
    }

    fn build(name: Option<String>, runner: Runner) -> Self {
        Self {
            inner: Arc::new(ListenerInner {
                id: ListenerId::new(),
                name,
                runner,
                rules: RwLock::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.inner.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Appends a rule with the identity transform.
    pub fn add_rule(&self, matcher: impl Into<Matcher>) -> &Self {
        self.push(Rule::new(matcher))
    }

    /// Appends a rule with a transform.
    pub fn add_rule_with(&self, matcher: impl Into<Matcher>, transform: Transform) -> &Self {
        self.push(Rule::with_transform(matcher, transform))
    }

    /// Appends rules in order. A missing transform means identity.
    pub fn add_rules<I, M>(&self, rules: I) -> &Self
    where
        I: IntoIterator<Item = (M, Option<Transform>)>,
        M: Into<Matcher>,
    {
        for (matcher, transform) in rules {
            self.push(Rule::with_transform(matcher, transform.unwrap_or_default()));
        }
        self
    }

    /// Builder form of [`Listener::add_rule`].
    #[must_use]
    pub fn with_rule(self, matcher: impl Into<Matcher>) -> Self {
        self.add_rule(matcher);
        self
    }

    /// Builder form of [`Listener::add_rule_with`].
    #[must_use]
    pub fn with_rule_transform(self, matcher: impl Into<Matcher>, transform: Transform) -> Self {
        self.add_rule_with(matcher, transform);
        self
    }

    /// Builder form of [`Listener::add_rules`].
    #[must_use]
    pub fn with_rules<I, M>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = (M, Option<Transform>)>,
        M: Into<Matcher>,
    {
        self.add_rules(rules);
        self
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.read_rules().len()
    }

    /// Returns true if both handles refer to the same listener.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn runner(&self) -> &Runner {
        &self.inner.runner
    }

    /// Copies the current rules; later additions are not visible in the copy.
    pub(crate) fn snapshot_rules(&self) -> Vec<Rule> {
        self.read_rules().clone()
    }

    fn push(&self, rule: Rule) -> &Self {
        // The vector is only ever pushed to, so a poisoned guard still holds a
        // consistent list.
        self.inner
            .rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(rule);
        self
    }

    fn read_rules(&self) -> std::sync::RwLockReadGuard<'_, Vec<Rule>> {
        self.inner.rules.read().unwrap_or_else(PoisonError::into_inner)
    }
}
