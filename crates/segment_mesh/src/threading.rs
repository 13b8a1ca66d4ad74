//! Fire-and-forget background tasks on rayon's thread pool.
//!
//! Scene-mutating work triggered by selection, coloring, focus and enable
//! events runs here so the caller returns immediately. There is no result
//! channel and no back-pressure; each task gets a [`TaskId`] and the pool
//! tracks what is still pending so tests and shutdown code can wait for
//! quiescence.
//!
//! ```ignore
//! let pool = TaskPool::new();
//! let id = pool.spawn(move || synchronizer.reconcile(false));
//! pool.wait_idle(Duration::from_secs(5));
//! ```

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::error;
use web_time::Instant;

/// Unique identifier for a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

#[derive(Default)]
struct PoolState {
  pending: Mutex<HashSet<TaskId>>,
  idle: Condvar,
}

impl PoolState {
  fn pending(&self) -> MutexGuard<'_, HashSet<TaskId>> {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Task pool handle. Clones share the same pending set.
#[derive(Clone, Default)]
pub struct TaskPool {
  state: Arc<PoolState>,
}

impl TaskPool {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `work` on rayon's thread pool (non-blocking).
  ///
  /// A panicking task is logged and counted as finished.
  pub fn spawn<F>(&self, work: F) -> TaskId
  where
    F: FnOnce() + Send + 'static,
  {
    let task_id = TaskId::next();
    self.state.pending().insert(task_id);

    let state = Arc::clone(&self.state);
    rayon::spawn(move || {
      if let Err(panic) = catch_unwind(AssertUnwindSafe(work)) {
        error!(?task_id, message = panic_message(&*panic), "background task panicked");
      }

      let mut pending = state.pending();
      pending.remove(&task_id);
      if pending.is_empty() {
        state.idle.notify_all();
      }
    });

    task_id
  }

  pub fn is_pending(&self, task_id: TaskId) -> bool {
    self.state.pending().contains(&task_id)
  }

  /// Number of tasks currently queued or running.
  pub fn pending_count(&self) -> usize {
    self.state.pending().len()
  }

  /// Number of worker threads in rayon's pool.
  pub fn num_threads(&self) -> usize {
    rayon::current_num_threads()
  }

  /// Block until no task is pending or `timeout` elapses. Returns true when
  /// the pool went idle.
  ///
  /// Tasks spawned by running tasks are waited for as well.
  pub fn wait_idle(&self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut pending = self.state.pending();
    while !pending.is_empty() {
      let now = Instant::now();
      if now >= deadline {
        return false;
      }
      pending = match self.state.idle.wait_timeout(pending, deadline - now) {
        Ok((guard, _)) => guard,
        Err(poisoned) => poisoned.into_inner().0,
      };
    }
    true
  }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}

// =============================================================================
// Tests
// =============================================================================
