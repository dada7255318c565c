// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// Timeout clock - cancellable delayed callbacks
//
// The listener arms a timer to detect that no navigation started. Disarming
// is idempotent: disarming a handle that already fired or was already
// disarmed does nothing.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Identifies one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Callback run when a timer fires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// A `setTimeout`/`clearTimeout`-style timer service.
pub trait TimerService: Send + Sync {
    /// Schedules `callback` to run once after `delay`.
    fn arm(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancels a scheduled callback. No-op if it already fired or was disarmed.
    fn disarm(&self, handle: TimerHandle);
}

/// [`TimerService`] backed by tokio tasks.
pub struct TokioTimer {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<TimerHandle, JoinHandle<()>>>>,
}

impl TokioTimer {
    /// Creates a timer that spawns onto the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a timer on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] when called outside a tokio runtime.
    pub fn from_current() -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        Ok(Self::new(runtime))
    }

    /// Number of timers that are armed and have not fired yet.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl TimerService for TokioTimer {
    fn arm(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tasks = Arc::clone(&self.tasks);

        // Hold the lock while spawning so the task cannot remove its entry
        // before it was inserted.
        let mut guard = self.tasks.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Removal decides the race with disarm(): whoever removes the
            // entry owns the timer.
            if tasks.lock().remove(&handle).is_some() {
                callback();
            }
        });
        guard.insert(handle, task);

        tracing::trace!("Armed timer {:?} for {:?}", handle, delay);
        handle
    }

    fn disarm(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.lock().remove(&handle) {
            task.abort();
            tracing::trace!("Disarmed timer {:?}", handle);
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for TokioTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioTimer")
            .field("pending", &self.pending())
            .finish()
    }
}
