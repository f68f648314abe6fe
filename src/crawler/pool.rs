//! Fixed-size worker pool fed by a bounded job queue
//!
//! Workers share one receiving end of a tokio mpsc channel. `submit` waits
//! while the queue is full, so the producer can never run more than
//! `queue_capacity` jobs ahead of the workers. Every job runs in its own task
//! so a panicking job is contained and its worker moves on.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// Errors returned by the worker pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Worker pool is closed")]
    Closed,
}

/// Counters reported when the pool is drained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub panicked: u64,
}

/// Per-worker totals
#[derive(Debug, Default)]
struct WorkerReport {
    completed: u64,
    panicked: u64,
}

/// A fixed number of workers running one handler over submitted jobs
pub struct WorkerPool<J> {
    sender: mpsc::Sender<J>,
    workers: JoinSet<WorkerReport>,
    submitted: u64,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Starts `workers` workers that call `handler` for each submitted job
    ///
    /// Zero for either size is raised to one.
    pub fn new<H, Fut>(workers: usize, queue_capacity: usize, handler: H) -> Self
    where
        H: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let mut set = JoinSet::new();
        for id in 0..workers.max(1) {
            set.spawn(worker_loop(id, Arc::clone(&receiver), Arc::clone(&handler)));
        }

        tracing::debug!(workers = workers.max(1), queue_capacity, "worker pool started");

        Self {
            sender,
            workers: set,
            submitted: 0,
        }
    }

    /// Queues a job, waiting for room when the queue is full
    pub async fn submit(&mut self, job: J) -> Result<(), PoolError> {
        self.sender.send(job).await.map_err(|_| PoolError::Closed)?;
        self.submitted += 1;
        Ok(())
    }

    /// Number of jobs accepted so far
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Closes the queue and waits for every queued and running job to finish
    pub async fn drain(self) -> PoolStats {
        let Self {
            sender,
            mut workers,
            submitted,
        } = self;
        drop(sender);

        let mut stats = PoolStats {
            submitted,
            ..PoolStats::default()
        };

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => {
                    stats.completed += report.completed;
                    stats.panicked += report.panicked;
                }
                Err(e) => tracing::error!(error = %e, "worker task failed"),
            }
        }

        tracing::debug!(
            submitted = stats.submitted,
            completed = stats.completed,
            panicked = stats.panicked,
            "worker pool drained"
        );
        stats
    }
}

async fn worker_loop<J, H, Fut>(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<J>>>,
    handler: Arc<H>,
) -> WorkerReport
where
    J: Send + 'static,
    H: Fn(J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut report = WorkerReport::default();

    loop {
        // The lock is only held while waiting for the next job
        let job = { receiver.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        match tokio::spawn(handler(job)).await {
            Ok(()) => report.completed += 1,
            Err(e) => {
                tracing::error!(worker = id, error = %e, "job panicked");
                report.panicked += 1;
            }
        }
    }

    tracing::trace!(worker = id, completed = report.completed, "worker exiting");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn test_runs_every_job() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut pool = WorkerPool::new(4, 8, move |n: usize| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(n, Ordering::SeqCst);
            }
        });

        for n in 1..=100 {
            pool.submit(n).await.unwrap();
        }
        let stats = pool.drain().await;

        assert_eq!(seen.load(Ordering::SeqCst), 5050);
        assert_eq!(stats.submitted, 100);
        assert_eq!(stats.completed, 100);
        assert_eq!(stats.panicked, 0);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_worker_count() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (current, max) = (Arc::clone(&in_flight), Arc::clone(&peak));

        let mut pool = WorkerPool::new(3, 2, move |_: u32| {
            let current = Arc::clone(&current);
            let max = Arc::clone(&max);
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }
        });

        for job in 0..30 {
            pool.submit(job).await.unwrap();
        }
        pool.drain().await;

        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeded 3 workers", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_submit_blocks_when_queue_is_full() {
        let gate = Arc::new(Semaphore::new(0));
        let handler_gate = Arc::clone(&gate);
        let mut pool = WorkerPool::new(1, 1, move |_: u32| {
            let gate = Arc::clone(&handler_gate);
            async move {
                gate.acquire().await.unwrap().forget();
            }
        });

        // First job occupies the only worker
        pool.submit(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Second job fills the queue
        tokio::time::timeout(Duration::from_millis(200), pool.submit(2))
            .await
            .expect("queue should have room for one job")
            .unwrap();

        // Third job has nowhere to go
        let blocked = tokio::time::timeout(Duration::from_millis(100), pool.submit(3)).await;
        assert!(blocked.is_err(), "submit should wait while the queue is full");

        gate.add_permits(10);
        let stats = pool.drain().await;
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.completed, 2);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_pool() {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let mut pool = WorkerPool::new(1, 4, move |n: u32| {
            let counter = Arc::clone(&counter);
            async move {
                if n == 2 {
                    panic!("job {} exploded", n);
                }
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        for n in 1..=4 {
            pool.submit(n).await.unwrap();
        }
        let stats = pool.drain().await;

        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.panicked, 1);
    }

    #[tokio::test]
    async fn test_drain_with_no_jobs() {
        let pool = WorkerPool::new(2, 2, |_: u8| async {});
        let stats = pool.drain().await;
        assert_eq!(stats, PoolStats::default());
    }
}
