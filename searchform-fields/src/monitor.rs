//! Hydration gate.
//!
//! Counts outstanding asynchronous hydrations and holds "ready" callbacks
//! until the count returns to zero.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use tracing::trace;

type Task = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct MonitorState {
    count: usize,
    pending: IndexMap<String, Task>,
}

/// Callbacks released by the last outstanding hydration.
///
/// Returned by [`TaskMonitor::release_deferred`] so the caller can finish
/// its own bookkeeping before running them.
#[must_use = "ready tasks do nothing until run"]
#[derive(Default)]
pub struct ReadyTasks(Vec<Task>);

impl ReadyTasks {
    pub fn run(self) {
        for task in self.0 {
            task();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn extend(&mut self, other: ReadyTasks) {
        self.0.extend(other.0);
    }
}

/// Tracks in-flight hydrations and gates `when_ready` callbacks.
///
/// Callbacks always run outside the internal lock, so they may call back
/// into the monitor.
#[derive(Default)]
pub struct TaskMonitor {
    state: Mutex<MonitorState>,
}

impl TaskMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more outstanding hydration.
    pub fn capture(&self) {
        let mut state = self.lock();
        state.count += 1;
        trace!(pending = state.count, "hydration captured");
    }

    /// Record one finished hydration, running ready callbacks if it was the last.
    ///
    /// Releasing at zero is a no-op.
    pub fn release(&self) {
        self.release_deferred().run();
    }

    /// Like [`TaskMonitor::release`], but hands the ready callbacks back
    /// instead of running them.
    pub fn release_deferred(&self) -> ReadyTasks {
        let mut state = self.lock();
        if state.count == 0 {
            return ReadyTasks::default();
        }
        state.count -= 1;
        trace!(pending = state.count, "hydration released");
        if state.count > 0 {
            return ReadyTasks::default();
        }
        ReadyTasks(state.pending.drain(..).map(|(_, task)| task).collect())
    }

    pub fn is_hydrating(&self) -> bool {
        self.lock().count > 0
    }

    /// Number of outstanding hydrations.
    pub fn pending(&self) -> usize {
        self.lock().count
    }

    /// Run `task` now when idle, otherwise once every hydration settles.
    ///
    /// At most one task is held per key: a later call with the same key
    /// replaces the earlier task.
    pub fn when_ready(&self, key: impl Into<String>, task: impl FnOnce() + Send + 'static) {
        let key = key.into();
        {
            let mut state = self.lock();
            if state.count > 0 {
                trace!(%key, "deferring task until hydration settles");
                state.pending.insert(key, Box::new(task));
                return;
            }
        }
        task();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TaskMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TaskMonitor")
            .field("count", &state.count)
            .field("pending", &state.pending.keys().collect::<Vec<_>>())
            .finish()
    }
}
