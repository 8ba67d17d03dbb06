//! Error types for action listeners.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! failure that aborted a dispatch.

use thiserror::Error;

use crate::listener::ListenerId;

/// Boxed error raised by user callbacks (transforms and runners).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Validation errors raised while building matchers and rules.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    #[error("Matcher cannot be empty")]
    EmptyMatcher,
}

/// Execution errors raised while an action passes through the pipeline.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Transform of rule {rule} on listener {listener} failed: {source}")]
    TransformFailed {
        listener: ListenerId,
        rule: usize,
        #[source]
        source: Box<ListenerError>,
    },

    #[error("Runner of listener {listener} failed: {source}")]
    RunnerFailed {
        listener: ListenerId,
        #[source]
        source: Box<ListenerError>,
    },

    #[error("Dispatch nesting depth {depth} exceeds maximum of {max}")]
    DispatchDepthExceeded {
        depth: usize,
        max: usize,
    },

    #[error("Pipeline disconnected: {path}")]
    Disconnected {
        path: String,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Callback error: {0}")]
    Callback(#[source] BoxError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ListenerError {
    /// Lifts an arbitrary error raised inside a transform or runner.
    #[must_use]
    pub fn callback(err: impl Into<BoxError>) -> Self {
        Self::Callback(err.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this error was raised by user code.
    #[must_use]
    pub const fn is_callback(&self) -> bool {
        matches!(self, Self::Callback(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns the innermost error, unwrapping transform/runner context.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Execution(
                ExecutionError::TransformFailed { source, .. }
                | ExecutionError::RunnerFailed { source, .. },
            ) => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias for listener operations.
pub type ListenerResult<T> = Result<T, ListenerError>;
