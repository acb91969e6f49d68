use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use crate::error::{CompositorError, Result};

/// Bounds how many backend invocations run at once
///
/// A permit is held for the duration of one render attempt. Heavier attempts
/// may take several permits, capped at the pool size.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for `weight` permits
    pub async fn acquire(&self, weight: usize) -> Result<SemaphorePermit<'_>> {
        let weight = weight.clamp(1, self.size);
        if self.available() < weight {
            debug!("Waiting for {} of {} render slots", weight, self.size);
        }
        self.semaphore
            .acquire_many(weight as u32)
            .await
            .map_err(|_| CompositorError::generic("render pool is closed"))
    }
}
