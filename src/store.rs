//! In-memory reducer store.
//!
//! This module provides a minimal reducer-driven state container that hosts a
//! middleware chain. It is intended for embedded usage, tests, and as a
//! reference implementation of the store side of [`Middleware`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{ExecutionError, ListenerError, ListenerResult};
use crate::middleware::{Dispatch, Middleware, StoreApi};

type ReducerFn<S> = dyn Fn(&S, &Action) -> S + Send + Sync;
type SubscriberFn<S> = dyn Fn(&S) + Send + Sync;

/// Identifier returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(u64);

fn lock_err(context: &'static str) -> ListenerError {
    ListenerError::internal(format!("poisoned lock: {context}"))
}

fn disconnected() -> ListenerError {
    ExecutionError::Disconnected {
        path: "store".to_string(),
    }
    .into()
}

struct StoreInner<S> {
    state: RwLock<S>,
    reducer: Box<ReducerFn<S>>,
    middleware: Vec<Arc<dyn Middleware<S>>>,
    subscribers: RwLock<Vec<(SubscriberId, Arc<SubscriberFn<S>>)>>,
    next_subscriber: AtomicU64,
    api: StoreApi<S>,
}

/// Reducer-driven state container.
///
/// Cloning a store yields another handle to the same state.
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Store<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates a store without middleware.
    pub fn new<R>(reducer: R, initial: S) -> Self
    where
        R: Fn(&S, &Action) -> S + Send + Sync + 'static,
    {
        Self::with_middleware(reducer, initial, Vec::new())
    }

    /// Creates a store whose dispatches run through `middleware` in order
    /// before reaching the reducer.
    pub fn with_middleware<R>(reducer: R, initial: S, middleware: Vec<Arc<dyn Middleware<S>>>) -> Self
    where
        R: Fn(&S, &Action) -> S + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner<S>>| {
            let state_ref = weak.clone();
            let dispatch_ref = weak.clone();
            let api = StoreApi::new(
                move || {
                    let inner = state_ref.upgrade().ok_or_else(disconnected)?;
                    let state = inner.state.read().map_err(|_| lock_err("state"))?;
                    Ok(state.clone())
                },
                Dispatch::new(move |action| {
                    let inner = dispatch_ref.upgrade().ok_or_else(disconnected)?;
                    run(&inner, 0, action)
                }),
            );

            StoreInner {
                state: RwLock::new(initial),
                reducer: Box::new(reducer),
                middleware,
                subscribers: RwLock::new(Vec::new()),
                next_subscriber: AtomicU64::new(0),
                api,
            }
        });

        Self { inner }
    }

    /// Routes an action through the middleware chain and the reducer.
    pub fn dispatch(&self, action: Action) -> ListenerResult<Action> {
        run(&self.inner, 0, action)
    }

    /// Returns a handle that dispatches into this store.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatch {
        self.inner.api.dispatch().clone()
    }

    /// Returns a snapshot of the current state.
    pub fn get_state(&self) -> ListenerResult<S> {
        self.inner.api.get_state()
    }

    /// Registers a callback invoked with the new state after every reduction.
    pub fn subscribe<F>(&self, callback: F) -> ListenerResult<SubscriberId>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscribers
            .write()
            .map_err(|_| lock_err("subscribers"))?
            .push((id, Arc::new(callback)));
        Ok(id)
    }

    /// Removes a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> ListenerResult<bool> {
        let mut subs = self
            .inner
            .subscribers
            .write()
            .map_err(|_| lock_err("subscribers"))?;
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        Ok(subs.len() != before)
    }
}

fn run<S>(inner: &Arc<StoreInner<S>>, index: usize, action: Action) -> ListenerResult<Action>
where
    S: Clone + Send + Sync + 'static,
{
    match inner.middleware.get(index) {
        Some(mw) => mw.handle(&inner.api, action, &|action| run(inner, index + 1, action)),
        None => {
            reduce(inner, &action)?;
            Ok(action)
        }
    }
}

fn reduce<S>(inner: &StoreInner<S>, action: &Action) -> ListenerResult<()>
where
    S: Clone + Send + Sync + 'static,
{
    let next = {
        let mut state = inner.state.write().map_err(|_| lock_err("state"))?;
        let reduced = (inner.reducer)(&*state, action);
        *state = reduced;
        state.clone()
    };

    // Subscribers may dispatch, so no lock is held while they run.
    let subscribers: Vec<Arc<SubscriberFn<S>>> = inner
        .subscribers
        .read()
        .map_err(|_| lock_err("subscribers"))?
        .iter()
        .map(|(_, cb)| Arc::clone(cb))
        .collect();

    for callback in subscribers {
        callback(&next);
    }
    Ok(())
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("middleware", &self.inner.middleware.len())
            .finish_non_exhaustive()
    }
}
