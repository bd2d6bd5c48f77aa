//! Detached background tasks.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

/// Handle to a set of background tasks.
///
/// Tasks run on the tokio runtime independently of the request that
/// spawned them: cancelling or dropping the request future does not cancel
/// them. The host calls [`BackgroundTasks::drain`] before teardown to let
/// every task run to completion. Dropping the last handle aborts whatever is
/// still running.
///
/// Cloning yields another handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    set: Arc<Mutex<JoinSet<()>>>,
    running: Arc<Running>,
}

/// Count of unfinished tasks, shared with the tasks themselves.
#[derive(Debug, Default)]
struct Running {
    count: AtomicUsize,
    idle: Notify,
}

/// Held by a task until its future is dropped, whether it finished,
/// panicked or was aborted.
struct RunningGuard {
    running: Arc<Running>,
    name: &'static str,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(task = self.name, "background task panicked");
        }
        if self.running.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.running.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    /// Create an empty task set.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a task. Must be called from within a tokio runtime.
    ///
    /// Tasks that already finished are reaped first so the set does not grow
    /// with completed work.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.running.count.fetch_add(1, Ordering::AcqRel);
        let guard = RunningGuard {
            running: self.running.clone(),
            name,
        };
        let task = async move {
            let _guard = guard;
            task.await;
        };

        let mut set = self.lock();
        reap(&mut set);
        set.spawn(task.instrument(tracing::debug_span!("background", task = name)));
    }

    /// Number of tasks not yet finished.
    pub fn pending(&self) -> usize {
        self.running.count.load(Ordering::Acquire)
    }

    /// Wait for every task, including tasks spawned while draining.
    ///
    /// Cancelling the returned future leaves the tasks running, and any
    /// number of callers may wait at the same time.
    pub async fn drain(&self) {
        loop {
            let idle = self.running.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if self.pending() == 0 {
                break;
            }
            idle.await;
        }
        reap(&mut self.lock());
    }
}

fn reap(set: &mut JoinSet<()>) {
    while let Some(result) = set.try_join_next() {
        log_join(result);
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(err) = result {
        if !err.is_panic() {
            tracing::debug!(error = %err, "background task cancelled");
        }
    }
}
