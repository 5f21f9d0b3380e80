//! Deferred-execution primitives
//!
//! Both schedulers guarantee a task never runs inside the `defer` call that
//! queued it. Only [`QueueScheduler`] and [`TokioScheduler`] on a
//! current-thread runtime also guarantee it runs after the caller's stack has
//! unwound.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use tokio::runtime::Handle;

use super::{
    error::LoadResult,
    traits::{Scheduler, Task},
};

/// Spawns each task onto a tokio runtime.
///
/// On a multi-thread runtime another worker may pick the task up before
/// `defer` returns, so a deferred callback can race the code that registered
/// it. Use a current-thread runtime when callers rely on the callback running
/// strictly after `when` returns.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Create a scheduler spawning onto `handle`
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime of the calling context.
    pub fn current() -> LoadResult<Self> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Scheduler for TokioScheduler {
    fn defer(&self, task: Task) {
        self.handle.spawn(async move { task() });
    }
}

/// FIFO queue drained explicitly by the embedder.
#[derive(Default)]
pub struct QueueScheduler {
    queue: Mutex<VecDeque<Task>>,
}

impl QueueScheduler {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn pop(&self) -> Option<Task> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Run queued tasks, including ones queued while draining. Returns how
    /// many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop() {
            task();
            ran += 1;
        }
        ran
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scheduler for QueueScheduler {
    fn defer(&self, task: Task) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn test_queue_scheduler_defers() {
        let scheduler = Arc::new(QueueScheduler::new());
        let count = Arc::new(AtomicUsize::new(0));

        let counter = count.clone();
        let inner = scheduler.clone();
        scheduler.defer(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let counter = counter.clone();
            inner.defer(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_tokio_scheduler_defers() {
        let scheduler = TokioScheduler::current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let fired = Arc::new(AtomicUsize::new(0));

        let flag = fired.clone();
        scheduler.defer(Box::new(move || {
            flag.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        }));

        // current-thread runtime: nothing runs until we yield
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        rx.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tokio_scheduler_requires_runtime() {
        assert!(TokioScheduler::current().is_err());
    }
}
