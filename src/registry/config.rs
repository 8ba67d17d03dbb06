//! Registry configuration.

use serde::{Deserialize, Serialize};

/// What the registry does when a transform or runner fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first failure aborts evaluation and the dispatch that caused it.
    #[default]
    FailFast,
    /// Failures are logged and counted; evaluation continues and the action is
    /// still forwarded downstream.
    Isolate,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Failure handling for transforms and runners.
    pub failure_policy: FailurePolicy,
    /// Max nested interceptions on one thread. `None` disables the bound.
    pub max_dispatch_depth: Option<usize>,
}

impl RegistryConfig {
    /// Default nesting bound for synchronous re-dispatch.
    pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 256;

    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_max_dispatch_depth(mut self, max: Option<usize>) -> Self {
        self.max_dispatch_depth = max;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::FailFast,
            max_dispatch_depth: Some(Self::DEFAULT_MAX_DISPATCH_DEPTH),
        }
    }
}
