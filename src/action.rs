//! Action records.
//!
//! An action is an opaque JSON record identified by its `"type"` field. The
//! registry only ever reads the discriminant; everything else is carried
//! through untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the action discriminant.
pub const TYPE_FIELD: &str = "type";

/// Field holding the conventional action payload.
pub const PAYLOAD_FIELD: &str = "payload";

/// A dispatched action.
///
/// Any JSON value is accepted, so malformed actions can flow through the
/// pipeline without being rejected.
///
/// # Examples
///
/// ```
/// use action_listeners::Action;
/// use serde_json::json;
///
/// let action = Action::with_payload("SET_USER", json!({ "name": "Foo" }));
/// assert_eq!(action.discriminant(), Some("SET_USER"));
/// assert_eq!(action.payload(), Some(&json!({ "name": "Foo" })));
///
/// let untyped = Action::from_value(json!({ "foo": "bar" }));
/// assert_eq!(untyped.discriminant(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(Value);

impl Action {
    /// Creates an action with the given discriminant and no payload.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(TYPE_FIELD.to_string(), Value::String(kind.into()));
        Self(Value::Object(map))
    }

    /// Creates an action with the given discriminant and payload.
    #[must_use]
    pub fn with_payload(kind: impl Into<String>, payload: Value) -> Self {
        let mut action = Self::new(kind);
        action.set_payload(payload);
        action
    }

    /// Wraps an arbitrary JSON value without inspecting it.
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Returns the discriminant if the action is typed.
    ///
    /// Only a non-empty string counts. Missing, null, boolean, numeric and empty
    /// discriminants all mark the action as untyped.
    #[must_use]
    pub fn discriminant(&self) -> Option<&str> {
        match self.0.get(TYPE_FIELD) {
            Some(Value::String(kind)) if !kind.is_empty() => Some(kind.as_str()),
            _ => None,
        }
    }

    /// Returns true if the action carries a usable discriminant.
    #[must_use]
    pub fn is_typed(&self) -> bool {
        self.discriminant().is_some()
    }

    /// Returns the payload field, if present.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.get(PAYLOAD_FIELD)
    }

    /// Returns a top-level field, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Sets a top-level field.
    ///
    /// Returns false and leaves the action unchanged when it is not a JSON object.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> bool {
        match &mut self.0 {
            Value::Object(map) => {
                map.insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Sets the payload field.
    pub fn set_payload(&mut self, payload: Value) -> bool {
        self.set(PAYLOAD_FIELD, payload)
    }

    /// Removes a top-level field, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match &mut self.0 {
            Value::Object(map) => map.remove(key),
            _ => None,
        }
    }

    /// Borrows the underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the action, returning the underlying JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Action {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        action.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.discriminant() {
            Some(kind) => write!(f, "{kind}"),
            None => write!(f, "<untyped>"),
        }
    }
}
