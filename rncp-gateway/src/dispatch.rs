//! Throttled dispatcher
//!
//! Serializes every upstream call through one FIFO queue:
//! - at most one task runs at any instant
//! - a minimum delay separates the end of one task from the start of the next
//! - a failing (or panicking) task only fails its own caller
//!
//! The queue is pumped by a drain task that is spawned on the first enqueue
//! while idle and exits once the queue is empty (`Idle → Draining → Idle`).

use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::GatewayError;

/// Boxed task as stored in the queue; it reports its own result.
type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Minimum delay between the end of one dispatch and the start of the next
    pub min_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(100),
        }
    }
}

/// Dispatcher statistics
#[derive(Debug, Default)]
pub struct DispatcherStats {
    pub enqueued: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub drains_started: AtomicU64,
}

/// Point-in-time copy of [`DispatcherStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStatsSnapshot {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
    pub drains_started: u64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            drains_started: self.drains_started.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<Job>,
    draining: bool,
    last_finished: Option<Instant>,
}

struct Inner {
    config: DispatcherConfig,
    state: Mutex<QueueState>,
    stats: DispatcherStats,
}

impl Inner {
    // never held across an await
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// FIFO, one-at-a-time, rate-spaced task runner.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(QueueState::default()),
                stats: DispatcherStats::default(),
            }),
        }
    }

    /// Queue a task and wait for its result.
    ///
    /// The task runs to completion even if the caller stops waiting.
    pub async fn enqueue<F, T>(&self, task: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>> + Send + 'static,
        T: Send + 'static,
    {
        let (response_tx, response_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);

        let job: Job = Box::pin(async move {
            let result = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!("Dispatched task panicked");
                    Err(GatewayError::TaskAborted)
                });

            if result.is_ok() {
                inner.stats.completed.fetch_add(1, Ordering::Relaxed);
            } else {
                inner.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
            // caller may have gone away
            let _ = response_tx.send(result);
        });

        let (depth, start_drain) = {
            let mut state = self.inner.state();
            state.queue.push_back(job);
            let start = !state.draining;
            state.draining = true;
            (state.queue.len(), start)
        };
        self.inner.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        debug!(queue_depth = depth, "Task queued");

        if start_drain {
            self.inner.stats.drains_started.fetch_add(1, Ordering::Relaxed);
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }

        response_rx.await.map_err(|_| GatewayError::TaskAborted)?
    }

    /// Tasks waiting to run (excluding the one running)
    pub fn queue_depth(&self) -> usize {
        self.inner.state().queue.len()
    }

    /// Whether a drain task is currently pumping the queue
    pub fn is_draining(&self) -> bool {
        self.inner.state().draining
    }

    pub fn stats(&self) -> &DispatcherStats {
        &self.inner.stats
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

/// Run queued jobs one by one until the queue is empty.
async fn drain(inner: Arc<Inner>) {
    loop {
        let (job, last_finished) = {
            let mut state = inner.state();
            match state.queue.pop_front() {
                Some(job) => (job, state.last_finished),
                None => {
                    state.draining = false;
                    debug!("Queue empty");
                    return;
                }
            }
        };

        if let Some(last) = last_finished {
            let elapsed = last.elapsed();
            if elapsed < inner.config.min_interval {
                let wait = inner.config.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Waiting before next dispatch");
                tokio::time::sleep(wait).await;
            }
        }

        debug!("Executing task");
        job.await;

        inner.state().last_finished = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(DispatcherConfig {
            min_interval: Duration::from_millis(100),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_concurrent_and_spaced() {
        let dispatcher = dispatcher();
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));

        let calls = (0..50).map(|i| {
            let running = Arc::clone(&running);
            let max_running = Arc::clone(&max_running);
            let starts = Arc::clone(&starts);
            dispatcher.enqueue(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(now, Ordering::SeqCst);
                starts.lock().unwrap().push(Instant::now());
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            })
        });

        let results = futures::future::join_all(calls).await;
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.is_ok()));

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 50);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_order() {
        let dispatcher = dispatcher();
        let order = Arc::new(Mutex::new(Vec::new()));

        let calls = (0..10).map(|i| {
            let order = Arc::clone(&order);
            dispatcher.enqueue(async move {
                order.lock().unwrap().push(i);
                Ok(())
            })
        });
        futures::future::join_all(calls).await;

        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_queue() {
        let dispatcher = dispatcher();

        let failing = dispatcher.enqueue(async {
            Err::<u32, _>(GatewayError::Upstream {
                status: 500,
                body: "boom".into(),
            })
        });
        let next = dispatcher.enqueue(async { Ok(7u32) });

        let (failing, next) = tokio::join!(failing, next);
        assert!(matches!(failing, Err(GatewayError::Upstream { status: 500, .. })));
        assert_eq!(next.unwrap(), 7);

        let stats = dispatcher.stats().snapshot();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_task_is_isolated() {
        let dispatcher = dispatcher();

        let panicking = dispatcher.enqueue(async {
            if true {
                panic!("task exploded");
            }
            Ok(0u32)
        });
        let next = dispatcher.enqueue(async { Ok(1u32) });

        let (panicking, next) = tokio::join!(panicking, next);
        assert_eq!(panicking, Err(GatewayError::TaskAborted));
        assert_eq!(next.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarts_after_idle() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.enqueue(async { Ok(1) }).await.unwrap(), 1);

        // let the drain task observe the empty queue
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!dispatcher.is_draining());
        assert_eq!(dispatcher.queue_depth(), 0);

        assert_eq!(dispatcher.enqueue(async { Ok(2) }).await.unwrap(), 2);
        assert_eq!(dispatcher.stats().snapshot().drains_started, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_applies_across_drains() {
        let dispatcher = dispatcher();
        let first_done = {
            dispatcher.enqueue(async { Ok(()) }).await.unwrap();
            Instant::now()
        };

        // enqueue again immediately; the previous finish still counts
        let second_start = dispatcher.enqueue(async { Ok(Instant::now()) }).await.unwrap();
        assert!(second_start - first_done >= Duration::from_millis(100));
    }
}
