//! Admission gate
//!
//! Bounds how many jobs drive a backend at once, independently of how many
//! are waiting. A slot is held as an [`AdmissionPermit`] and released when
//! the permit is dropped, so every exit path gives it back exactly once.

use shared::error::{AppError, ErrorCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("No admission slot became free within {0:?}")]
    Timeout(Duration),

    #[error("Admission gate is closed")]
    Closed,
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        let code = match err {
            AdmissionError::Timeout(_) => ErrorCode::AdmissionTimeout,
            AdmissionError::Closed => ErrorCode::SystemBusy,
        };
        AppError::with_message(code, err.to_string())
    }
}

/// Counting gate over the printing slots
#[derive(Debug)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    active: Arc<AtomicUsize>,
}

/// One held slot
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl AdmissionPermit {
    /// Give the slot back
    pub fn release(self) {}
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionController {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        self.active.fetch_add(1, Ordering::SeqCst);
        AdmissionPermit {
            _permit: permit,
            active: self.active.clone(),
        }
    }

    /// Take a slot if one is free right now
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|p| self.admit(p))
    }

    /// Wait up to `timeout` for a slot
    pub async fn acquire(&self, timeout: Duration) -> Result<AdmissionPermit, AdmissionError> {
        match tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(self.admit(permit)),
            Ok(Err(_)) => Err(AdmissionError::Closed),
            Err(_) => Err(AdmissionError::Timeout(timeout)),
        }
    }

    /// Slots currently held
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Refuse all further acquisitions; held permits stay valid
    pub fn close(&self) {
        self.semaphore.close();
    }
}
