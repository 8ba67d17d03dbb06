//! # action-listeners
//!
//! Rule-matched side-effect listeners for action-dispatch pipelines. A
//! [`ListenerRegistry`] sits in a store's middleware chain, inspects every
//! dispatched [`Action`], and invokes [`Listener`] runners whose rules match the
//! action's discriminant. Reducers always receive the original action; rule
//! transforms only shape what runners see.
//!
//! ## Core Concepts
//!
//! - **Action**: an opaque JSON record identified by its `"type"` field
//! - **Matcher**: exact string or regex test against the discriminant
//! - **Rule**: a matcher paired with a transform applied to a private copy
//! - **Listener**: a runner bound to an append-only list of rules
//! - **Registry**: the middleware fanning actions out to listeners
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use action_listeners::{Action, Listener, ListenerRegistry, Matcher, Middleware, Store, Transform};
//! use serde_json::json;
//!
//! let registry = Arc::new(ListenerRegistry::new());
//!
//! let listener = Listener::from_fn(|action, _dispatch| {
//!     assert_eq!(action.payload(), Some(&json!({ "source": "listener" })));
//! });
//! listener.add_rule_with(
//!     Matcher::pattern("^INCR")?,
//!     Transform::map(|mut action| {
//!         action.set_payload(json!({ "source": "listener" }));
//!         action
//!     }),
//! );
//! registry.add_listener(listener);
//!
//! let store = Store::with_middleware(
//!     |count: &i64, action: &Action| match action.discriminant() {
//!         Some("INCREMENT") => count + 1,
//!         _ => *count,
//!     },
//!     0,
//!     vec![registry as Arc<dyn Middleware<i64>>],
//! );
//!
//! let forwarded = store.dispatch(Action::new("INCREMENT"))?;
//! assert!(forwarded.payload().is_none());
//! assert_eq!(store.get_state()?, 1);
//! # Ok::<(), action_listeners::ListenerError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod error;
pub mod listener;
pub mod matcher;
pub mod middleware;
pub mod registry;
pub mod rule;
pub mod store;

// Re-export primary types at crate root for convenience
pub use action::Action;
pub use error::{BoxError, ExecutionError, ListenerError, ListenerResult, ValidationError};
pub use listener::{Listener, ListenerId, Runner};
pub use matcher::Matcher;
pub use middleware::{Dispatch, Middleware, Next, StoreApi};
pub use registry::{FailurePolicy, ListenerRegistry, RegistryConfig, RegistryStats};
pub use rule::{Rule, Transform};
pub use store::{Store, SubscriberId};
