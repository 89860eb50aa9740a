//! CPU worker pool
//!
//! Fixed set of OS threads fed from a shared FIFO queue. Analysis jobs run
//! here instead of on the async runtime so CPU-bound work executes in true
//! parallel without starving channel coordination.

use crate::error::{panic_message, PoolError};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// State shared between the pool handle and its workers
struct SharedPoolState {
    /// Pending jobs in submission order
    queue: Mutex<VecDeque<Job>>,

    /// Wakes idle workers on new work or shutdown
    condvar: Condvar,

    /// Set under the queue lock; no job is accepted afterwards
    stop_flag: AtomicBool,
}

/// Thread pool for CPU-bound analysis
pub struct CpuPool {
    state: Arc<SharedPoolState>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    jobs_submitted: AtomicU64,
}

impl CpuPool {
    /// Start `size` worker threads
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }

        let state = Arc::new(SharedPoolState {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            stop_flag: AtomicBool::new(false),
        });

        let mut threads = Vec::with_capacity(size);
        for worker_id in 0..size {
            let worker_state = Arc::clone(&state);
            let spawned = thread::Builder::new()
                .name(format!("cpu-worker-{}", worker_id))
                .spawn(move || Self::worker_loop(worker_id, worker_state));

            match spawned {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    Self::signal_stop(&state);
                    for handle in threads {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        info!("CPU pool started with {} worker threads", size);

        Ok(Self {
            state,
            threads: Mutex::new(threads),
            jobs_submitted: AtomicU64::new(0),
        })
    }

    /// Run `job` on a worker thread and await its result
    ///
    /// A panic inside `job` is contained and returned as
    /// [`PoolError::Panicked`]; the worker keeps running.
    pub async fn run<F, R>(&self, job: F) -> Result<R, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let wrapped: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(job))
                .map_err(|payload| PoolError::Panicked(panic_message(payload.as_ref())));
            let _ = tx.send(outcome);
        });

        {
            let mut queue = self.state.queue.lock().unwrap_or_else(PoisonError::into_inner);
            if self.state.stop_flag.load(Ordering::Acquire) {
                return Err(PoolError::ShutDown);
            }
            queue.push_back(wrapped);
        }
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
        self.state.condvar.notify_one();

        rx.await.map_err(|_| PoolError::WorkerLost)?
    }

    /// Jobs accepted since the pool started
    pub fn jobs_submitted(&self) -> u64 {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    /// Stop accepting work, finish every queued job, join all workers
    pub async fn shutdown(&self) {
        Self::signal_stop(&self.state);

        let handles: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.threads.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if handles.is_empty() {
            return;
        }

        let joined = tokio::task::spawn_blocking(move || {
            for handle in handles {
                if handle.join().is_err() {
                    warn!("CPU worker thread exited abnormally");
                }
            }
        })
        .await;

        match joined {
            Ok(()) => info!("CPU pool shut down"),
            Err(e) => warn!("Failed to join CPU pool workers: {}", e),
        }
    }

    fn signal_stop(state: &SharedPoolState) {
        {
            let _queue = state.queue.lock().unwrap_or_else(PoisonError::into_inner);
            state.stop_flag.store(true, Ordering::Release);
        }
        state.condvar.notify_all();
    }

    /// Pop jobs until the queue is empty and stop has been signalled
    fn worker_loop(worker_id: usize, state: Arc<SharedPoolState>) {
        debug!("CPU worker {} started", worker_id);

        loop {
            let job = {
                let mut queue = state.queue.lock().unwrap_or_else(PoisonError::into_inner);
                loop {
                    if let Some(job) = queue.pop_front() {
                        break Some(job);
                    }
                    if state.stop_flag.load(Ordering::Acquire) {
                        break None;
                    }
                    queue = state
                        .condvar
                        .wait(queue)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            };

            match job {
                Some(job) => job(),
                None => break,
            }
        }

        debug!("CPU worker {} exiting", worker_id);
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        // Workers drain and exit on their own; nobody joins them here
        Self::signal_stop(&self.state);
    }
}
