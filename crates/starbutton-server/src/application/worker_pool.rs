//! Fixed-size pool of worker threads running macro executions off the
//! receive thread.
//!
//! Jobs are queued on one unbounded FIFO channel shared by all workers, so
//! submission never blocks the receive loop.  Shutting the pool down closes
//! the channel: workers finish everything already queued, then exit when the
//! channel reports closed.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

use super::task::spawn_named;

/// A unit of work run on a pool thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    ShutDown,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every worker exited within the drain timeout.
    Drained,
    /// At least one worker was still busy at the deadline and was detached.
    TimedOut,
    AlreadyShutDown,
}

pub struct WorkerPool {
    capacity: usize,
    sender: Mutex<Option<UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `capacity` workers (at least one) named `starbutton-worker-N`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if the OS refuses to create a thread.
    /// Workers spawned before the failure are shut down.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(capacity);
        for index in 0..capacity {
            let rx = Arc::clone(&rx);
            match spawn_named(format!("starbutton-worker-{index}"), move || worker_loop(rx)) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Closing the channel lets the already spawned workers exit.
                    drop(tx);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        debug!("worker pool started with {capacity} workers");
        Ok(Self {
            capacity,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        })
    }

    /// The configured number of workers.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queues `job` for execution.  Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ShutDown`] once [`WorkerPool::shutdown`] has run.
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = lock(&self.sender);
        let tx = sender.as_ref().ok_or(PoolError::ShutDown)?;
        tx.send(Box::new(job)).map_err(|_| PoolError::ShutDown)
    }

    /// Stops accepting jobs and waits up to `drain_timeout` for queued and
    /// in-flight jobs to finish.
    ///
    /// Idempotent: later calls return [`ShutdownOutcome::AlreadyShutDown`].
    pub fn shutdown(&self, drain_timeout: Duration) -> ShutdownOutcome {
        let Some(tx) = lock(&self.sender).take() else {
            return ShutdownOutcome::AlreadyShutDown;
        };
        drop(tx);

        let mut workers = std::mem::take(&mut *lock(&self.workers));
        let deadline = Instant::now() + drain_timeout;
        while workers.iter().any(|w| !w.is_finished()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let mut stragglers = 0;
        for handle in workers.drain(..) {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                stragglers += 1;
            }
        }

        if stragglers == 0 {
            debug!("worker pool drained");
            ShutdownOutcome::Drained
        } else {
            warn!(
                "worker pool drain timed out after {drain_timeout:?}; {stragglers} worker(s) still busy"
            );
            ShutdownOutcome::TimedOut
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Detach without waiting; queued jobs still run to completion.
        lock(&self.sender).take();
    }
}

fn worker_loop(rx: Arc<Mutex<UnboundedReceiver<Job>>>) {
    loop {
        // The guard is released before the job runs so other workers can
        // pick up the next one.
        let job = lock(&rx).blocking_recv();
        let Some(job) = job else {
            break;
        };
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("worker job panicked; worker continues");
        }
    }
}

/// Locks `mutex`, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc as std_mpsc;

    #[test]
    fn test_capacity_is_configured_value() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.capacity(), 4);
        pool.shutdown(Duration::from_secs(1));
    }

    #[test]
    fn test_zero_capacity_is_clamped_to_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.capacity(), 1);
        pool.shutdown(Duration::from_secs(1));
    }

    #[test]
    fn test_submitted_jobs_run_on_named_workers() {
        // Arrange
        let pool = WorkerPool::new(2).unwrap();
        let (tx, rx) = std_mpsc::channel();

        // Act
        pool.submit(move || {
            let name = thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        })
        .unwrap();

        // Assert
        let name = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
        assert!(name.starts_with("starbutton-worker-"), "got {name}");
        pool.shutdown(Duration::from_secs(1));
    }

    #[test]
    fn test_shutdown_drains_queued_jobs() {
        // Arrange – one worker, several slow jobs queued behind each other
        let pool = WorkerPool::new(1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                thread::sleep(Duration::from_millis(10));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        // Act
        let outcome = pool.shutdown(Duration::from_secs(5));

        // Assert
        assert_eq!(outcome, ShutdownOutcome::Drained);
        assert_eq!(done.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown(Duration::from_secs(1));

        let result = pool.submit(|| {});

        assert!(matches!(result, Err(PoolError::ShutDown)));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = WorkerPool::new(1).unwrap();

        assert_eq!(pool.shutdown(Duration::from_secs(1)), ShutdownOutcome::Drained);
        assert_eq!(pool.shutdown(Duration::from_secs(1)), ShutdownOutcome::AlreadyShutDown);
    }

    #[test]
    fn test_shutdown_times_out_on_stuck_job() {
        // Arrange
        let pool = WorkerPool::new(1).unwrap();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        pool.submit(move || {
            let _ = release_rx.recv();
        })
        .unwrap();

        // Act
        let outcome = pool.shutdown(Duration::from_millis(50));

        // Assert
        assert_eq!(outcome, ShutdownOutcome::TimedOut);
        release_tx.send(()).unwrap();
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        // Arrange
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = std_mpsc::channel();

        // Act
        pool.submit(|| panic!("boom")).unwrap();
        pool.submit(move || tx.send(()).unwrap()).unwrap();

        // Assert – the same single worker ran the second job
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert_eq!(pool.shutdown(Duration::from_secs(1)), ShutdownOutcome::Drained);
    }

    #[test]
    fn test_jobs_run_concurrently_up_to_capacity() {
        // Arrange – three jobs that each wait at a barrier of three
        let pool = WorkerPool::new(3).unwrap();
        let barrier = Arc::new(std::sync::Barrier::new(3));
        let (tx, rx) = std_mpsc::channel();
        for _ in 0..3 {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            pool.submit(move || {
                barrier.wait();
                tx.send(()).unwrap();
            })
            .unwrap();
        }

        // Assert – all three pass the barrier, which needs three live workers
        for _ in 0..3 {
            rx.recv_timeout(Duration::from_secs(2)).unwrap();
        }
        pool.shutdown(Duration::from_secs(1));
    }
}
