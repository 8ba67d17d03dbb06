//! Listener registry: the middleware that fans actions out to listeners.
//!
//! For every intercepted action the registry walks listeners in registration
//! order and, within each listener, rules in the order they were added. Every
//! matching rule transforms its own copy of the action and invokes the
//! listener's runner. The original action is then forwarded downstream
//! unchanged, so reducers never see rule transforms.

/// Registry configuration.
pub mod config;
mod depth;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::action::Action;
use crate::error::{ExecutionError, ListenerError, ListenerResult};
use crate::listener::{Listener, ListenerId};
use crate::middleware::{Dispatch, Middleware, Next, StoreApi};
use crate::rule::Rule;

pub use config::{FailurePolicy, RegistryConfig};
use depth::DepthTracker;

/// Counters describing registry activity since construction.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub dispatched: u64,
    pub untyped: u64,
    pub matched: u64,
    pub isolated_failures: u64,
}

/// Ordered, append-only collection of listeners installed as middleware.
///
/// The registry is an explicit instance: wrap it in an `Arc`, install a clone
/// in the store's middleware chain, and keep another clone to register
/// listeners.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use action_listeners::{Action, Listener, ListenerRegistry, Middleware, Store};
///
/// let registry = Arc::new(ListenerRegistry::new());
/// registry.add_listener(Listener::from_fn(|_, _| {}).with_rule("INCREMENT"));
///
/// let store = Store::with_middleware(
///     |count: &i64, action: &Action| match action.discriminant() {
///         Some("INCREMENT") => count + 1,
///         _ => *count,
///     },
///     0,
///     vec![Arc::clone(&registry) as Arc<dyn Middleware<i64>>],
/// );
///
/// store.dispatch(Action::new("INCREMENT")).unwrap();
/// assert_eq!(store.get_state().unwrap(), 1);
/// assert_eq!(registry.stats().matched, 1);
/// ```
pub struct ListenerRegistry {
    cfg: RegistryConfig,
    listeners: RwLock<Vec<Listener>>,
    depth: DepthTracker,
    dispatched: AtomicU64,
    untyped: AtomicU64,
    matched: AtomicU64,
    isolated_failures: AtomicU64,
}

impl ListenerRegistry {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    #[must_use]
    pub fn with_config(cfg: RegistryConfig) -> Self {
        Self {
            cfg,
            listeners: RwLock::new(Vec::new()),
            depth: DepthTracker::default(),
            dispatched: AtomicU64::new(0),
            untyped: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            isolated_failures: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.cfg
    }

    /// Appends a listener.
    ///
    /// Duplicates are not detected: registering the same listener twice makes
    /// it run twice per matching action.
    pub fn add_listener(&self, listener: Listener) -> ListenerId {
        let id = listener.id();
        debug!(listener = %id, name = listener.name(), "registering listener");
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
        id
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            untyped: self.untyped.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            isolated_failures: self.isolated_failures.load(Ordering::Relaxed),
        }
    }

    /// Runs every matching rule for `action` without forwarding it.
    ///
    /// Listeners registered while this call is running are not consulted for
    /// this action. Rules added to a listener before the walk reaches it are.
    pub fn process(&self, action: &Action, dispatch: &Dispatch) -> ListenerResult<()> {
        let Some(kind) = action.discriminant() else {
            self.untyped.fetch_add(1, Ordering::Relaxed);
            trace!("untyped action passed through");
            return Ok(());
        };

        // Copy the list so runners can register listeners without deadlocking.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in &listeners {
            for (index, rule) in listener.snapshot_rules().iter().enumerate() {
                if !rule.matches(kind) {
                    continue;
                }

                self.matched.fetch_add(1, Ordering::Relaxed);
                debug!(
                    listener = %listener.id(),
                    name = listener.name(),
                    rule = index,
                    matcher = %rule.matcher(),
                    action = kind,
                    "rule matched"
                );

                let Err(err) = fire(listener, index, rule, action, dispatch) else {
                    continue;
                };

                match self.cfg.failure_policy {
                    FailurePolicy::FailFast => return Err(err),
                    FailurePolicy::Isolate => {
                        self.isolated_failures.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            listener = %listener.id(),
                            name = listener.name(),
                            rule = index,
                            action = kind,
                            error = %err,
                            "listener failed; continuing"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

fn fire(
    listener: &Listener,
    index: usize,
    rule: &Rule,
    action: &Action,
    dispatch: &Dispatch,
) -> ListenerResult<()> {
    let transformed = rule.apply(action).map_err(|source| {
        ListenerError::from(ExecutionError::TransformFailed {
            listener: listener.id(),
            rule: index,
            source: Box::new(source),
        })
    })?;

    listener.runner().run(transformed, dispatch).map_err(|source| {
        ExecutionError::RunnerFailed {
            listener: listener.id(),
            source: Box::new(source),
        }
        .into()
    })
}

impl<S> Middleware<S> for ListenerRegistry {
    fn handle(&self, api: &StoreApi<S>, action: Action, next: Next<'_>) -> ListenerResult<Action> {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        {
            let _guard = self.depth.enter(self.cfg.max_dispatch_depth)?;
            self.process(&action, api.dispatch())?;
        }
        next(action)
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("cfg", &self.cfg)
            .field("listeners", &self.listener_count())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use crate::matcher::Matcher;
    use crate::rule::Transform;

    type Seen = Arc<Mutex<Vec<Action>>>;

    fn recording() -> (Listener, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = Listener::from_fn(move |action, _| sink.lock().unwrap().push(action));
        (listener, seen)
    }

    fn api() -> StoreApi<()> {
        StoreApi::new(|| Ok(()), Dispatch::new(Ok))
    }

    fn forward(registry: &ListenerRegistry, action: Action) -> ListenerResult<Action> {
        registry.handle(&api(), action, &|action| Ok(action))
    }

    #[test]
    fn untyped_actions_skip_rules_and_pass_through() {
        let registry = ListenerRegistry::new();
        let (listener, seen) = recording();
        registry.add_listener(listener.with_rule(Matcher::pattern(".*").unwrap()));

        let action = Action::from_value(json!({ "foo": "bar" }));
        let out = forward(&registry, action.clone()).unwrap();

        assert_eq!(out, action);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(registry.stats().untyped, 1);
    }

    #[test]
    fn each_matching_rule_fires_independently() {
        let registry = ListenerRegistry::new();
        let (listener, seen) = recording();
        listener
            .add_rule("INCREMENT")
            .add_rule_with(
                Matcher::pattern("^INCR").unwrap(),
                Transform::map(|mut a| {
                    a.set_payload(json!(2));
                    a
                }),
            )
            .add_rule("DECREMENT");
        registry.add_listener(listener);

        forward(&registry, Action::new("INCREMENT")).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].payload().is_none());
        assert_eq!(seen[1].payload(), Some(&json!(2)));
    }

    #[test]
    fn forwards_original_action() {
        let registry = ListenerRegistry::new();
        let (listener, seen) = recording();
        registry.add_listener(listener.with_rule_transform(
            "INCREMENT",
            Transform::map(|mut a| {
                a.set_payload(json!({ "foo": "bar" }));
                a
            }),
        ));

        let out = forward(&registry, Action::new("INCREMENT")).unwrap();

        assert_eq!(out, Action::new("INCREMENT"));
        assert_eq!(seen.lock().unwrap()[0].payload(), Some(&json!({ "foo": "bar" })));
    }

    #[test]
    fn duplicate_registration_runs_twice() {
        let registry = ListenerRegistry::new();
        let (listener, seen) = recording();
        let listener = listener.with_rule("PING");
        registry.add_listener(listener.clone());
        registry.add_listener(listener);

        forward(&registry, Action::new("PING")).unwrap();

        assert_eq!(registry.listener_count(), 2);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn fail_fast_stops_remaining_listeners_and_forwarding() {
        let registry = ListenerRegistry::new();
        registry.add_listener(
            Listener::new(|_, _| Err(ListenerError::callback("boom"))).with_rule("PING"),
        );
        let (after, seen) = recording();
        registry.add_listener(after.with_rule("PING"));

        let forwarded = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&forwarded);
        let err = registry
            .handle(&api(), Action::new("PING"), &|action| {
                *flag.lock().unwrap() = true;
                Ok(action)
            })
            .unwrap_err();

        assert!(matches!(err, ListenerError::Execution(ExecutionError::RunnerFailed { .. })));
        assert!(err.root_cause().is_callback());
        assert!(seen.lock().unwrap().is_empty());
        assert!(!*forwarded.lock().unwrap());
    }

    #[test]
    fn transform_failure_names_rule() {
        let registry = ListenerRegistry::new();
        let (listener, seen) = recording();
        let listener = listener.with_rule("PING").with_rule_transform(
            "PING",
            Transform::new(|_| Err(ListenerError::callback("bad transform"))),
        );
        let id = registry.add_listener(listener);

        let err = forward(&registry, Action::new("PING")).unwrap_err();

        match err {
            ListenerError::Execution(ExecutionError::TransformFailed { listener, rule, .. }) => {
                assert_eq!(listener, id);
                assert_eq!(rule, 1);
            }
            other => panic!("expected transform failure, got {other:?}"),
        }
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn isolate_policy_continues_and_forwards() {
        let registry = ListenerRegistry::with_config(
            RegistryConfig::default().with_failure_policy(FailurePolicy::Isolate),
        );
        registry.add_listener(
            Listener::new(|_, _| Err(ListenerError::callback("boom"))).with_rule("PING"),
        );
        let (after, seen) = recording();
        registry.add_listener(after.with_rule("PING"));

        let out = forward(&registry, Action::new("PING")).unwrap();

        assert_eq!(out, Action::new("PING"));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(registry.stats().isolated_failures, 1);
    }

    #[test]
    fn listener_added_mid_pass_waits_for_next_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let (late, seen) = recording();
        let late = late.with_rule("PING");

        let reg = Arc::clone(&registry);
        registry.add_listener(
            Listener::from_fn(move |_, _| {
                if reg.listener_count() == 1 {
                    reg.add_listener(late.clone());
                }
            })
            .with_rule("PING"),
        );

        forward(&registry, Action::new("PING")).unwrap();
        assert!(seen.lock().unwrap().is_empty());

        forward(&registry, Action::new("PING")).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn stats_count_dispatches_and_matches() {
        let registry = ListenerRegistry::new();
        let (listener, _) = recording();
        registry.add_listener(listener.with_rule("A").with_rule("A"));

        forward(&registry, Action::new("A")).unwrap();
        forward(&registry, Action::new("B")).unwrap();

        assert_eq!(
            registry.stats(),
            RegistryStats {
                dispatched: 2,
                untyped: 0,
                matched: 2,
                isolated_failures: 0,
            }
        );
    }
}
