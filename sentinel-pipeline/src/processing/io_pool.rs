//! Blocking I/O pool
//!
//! Blocking writes run on the runtime's blocking threads, at most `size` at
//! a time. Each job holds a semaphore permit until its closure returns, even
//! if the caller stops awaiting it.

use crate::error::{panic_message, PoolError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Bounded pool for blocking I/O jobs
pub struct IoPool {
    permits: Arc<Semaphore>,
    size: u32,
    jobs_submitted: AtomicU64,
}

impl IoPool {
    pub fn new(size: usize) -> Result<Self, PoolError> {
        let size = u32::try_from(size).map_err(|_| PoolError::InvalidSize)?;
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(size as usize)),
            size,
            jobs_submitted: AtomicU64::new(0),
        })
    }

    /// Run a blocking `job` once a slot is free
    pub async fn run<F, R>(&self, job: F) -> Result<R, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShutDown)?;
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        match handle.await {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => {
                let payload = e.into_panic();
                Err(PoolError::Panicked(panic_message(payload.as_ref())))
            }
            Err(_) => Err(PoolError::WorkerLost),
        }
    }

    /// Jobs accepted since the pool started
    pub fn jobs_submitted(&self) -> u64 {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    /// Wait for every accepted job to finish, then refuse new ones
    pub async fn shutdown(&self) {
        match self.permits.acquire_many(self.size).await {
            Ok(_all) => {
                self.permits.close();
                info!("I/O pool shut down");
            }
            Err(_) => warn!("I/O pool already shut down"),
        }
    }
}
