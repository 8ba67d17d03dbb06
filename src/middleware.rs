//! Store boundary: the interception contract between a store and its
//! middleware chain.
//!
//! A store hands every middleware a [`StoreApi`] (state snapshot plus a
//! re-entrant [`Dispatch`] handle), the action, and a [`Next`] continuation
//! for the rest of the chain. This is the Rust form of the curried
//! `api => next => action` signature.

use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::error::ListenerResult;

type DispatchFn = dyn Fn(Action) -> ListenerResult<Action> + Send + Sync;
type GetStateFn<S> = dyn Fn() -> ListenerResult<S> + Send + Sync;

/// Continuation for the downstream part of the pipeline.
pub type Next<'a> = &'a dyn Fn(Action) -> ListenerResult<Action>;

/// Handle that routes an action through the whole pipeline from the top.
///
/// Cloneable and `Send`, so runners may move it into deferred work and
/// dispatch later from another thread.
#[derive(Clone)]
pub struct Dispatch(Arc<DispatchFn>);

impl Dispatch {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Action) -> ListenerResult<Action> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Dispatches an action, returning what the innermost handler returned.
    pub fn dispatch(&self, action: Action) -> ListenerResult<Action> {
        (self.0)(action)
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch(..)")
    }
}

/// Capabilities a store exposes to its middleware.
pub struct StoreApi<S> {
    get_state: Arc<GetStateFn<S>>,
    dispatch: Dispatch,
}

impl<S> StoreApi<S> {
    pub fn new<F>(get_state: F, dispatch: Dispatch) -> Self
    where
        F: Fn() -> ListenerResult<S> + Send + Sync + 'static,
    {
        Self {
            get_state: Arc::new(get_state),
            dispatch,
        }
    }

    /// Returns a snapshot of the current state.
    pub fn get_state(&self) -> ListenerResult<S> {
        (self.get_state)()
    }

    #[must_use]
    pub const fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

impl<S> Clone for StoreApi<S> {
    fn clone(&self) -> Self {
        Self {
            get_state: Arc::clone(&self.get_state),
            dispatch: self.dispatch.clone(),
        }
    }
}

impl<S> fmt::Debug for StoreApi<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreApi").finish_non_exhaustive()
    }
}

/// A stage in a store's dispatch pipeline.
pub trait Middleware<S>: Send + Sync {
    /// Handles one action. Implementations forward to `next` to continue the
    /// chain, and return whatever the chain returned.
    fn handle(&self, api: &StoreApi<S>, action: Action, next: Next<'_>) -> ListenerResult<Action>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tagging;

    impl Middleware<u32> for Tagging {
        fn handle(&self, _api: &StoreApi<u32>, mut action: Action, next: Next<'_>) -> ListenerResult<Action> {
            action.set("tagged", serde_json::Value::Bool(true));
            next(action)
        }
    }

    #[test]
    fn dispatch_handle_is_shared() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let dispatch = Dispatch::new(move |action| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(action)
        });

        let cloned = dispatch.clone();
        dispatch.dispatch(Action::new("A")).unwrap();
        cloned.dispatch(Action::new("B")).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn middleware_forwards_to_next() {
        let api = StoreApi::new(|| Ok(7u32), Dispatch::new(Ok));
        assert_eq!(api.get_state().unwrap(), 7);

        let out = Tagging
            .handle(&api, Action::new("A"), &|action| Ok(action))
            .unwrap();
        assert_eq!(out.get("tagged"), Some(&serde_json::Value::Bool(true)));
    }
}
