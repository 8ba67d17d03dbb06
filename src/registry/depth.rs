//! Per-thread nesting bound for re-entrant dispatch.
//!
//! A runner that dispatches synchronously re-enters the registry before the
//! outer pass has finished. Each thread tracks its own depth; dispatches made
//! from deferred work on another thread start a fresh count.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

use crate::error::{ExecutionError, ListenerResult};

#[derive(Debug, Default)]
pub(crate) struct DepthTracker {
    depths: Mutex<HashMap<ThreadId, usize>>,
}

impl DepthTracker {
    /// Enters one nesting level on the current thread.
    ///
    /// Fails without entering when the new depth would exceed `max`.
    pub(crate) fn enter(&self, max: Option<usize>) -> ListenerResult<DepthGuard<'_>> {
        let thread = thread::current().id();
        let mut depths = self.depths.lock().unwrap_or_else(PoisonError::into_inner);
        let depth = depths.get(&thread).copied().unwrap_or(0) + 1;

        if let Some(max) = max {
            if depth > max {
                return Err(ExecutionError::DispatchDepthExceeded { depth, max }.into());
            }
        }

        depths.insert(thread, depth);
        Ok(DepthGuard {
            tracker: self,
            thread,
        })
    }

    #[cfg(test)]
    fn current(&self) -> usize {
        let depths = self.depths.lock().unwrap_or_else(PoisonError::into_inner);
        depths.get(&thread::current().id()).copied().unwrap_or(0)
    }
}

/// Leaves the nesting level on drop, including during unwinding.
#[derive(Debug)]
pub(crate) struct DepthGuard<'a> {
    tracker: &'a DepthTracker,
    thread: ThreadId,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let mut depths = self
            .tracker
            .depths
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(depth) = depths.get_mut(&self.thread) {
            *depth -= 1;
            if *depth == 0 {
                depths.remove(&self.thread);
            }
        }
    }
}
