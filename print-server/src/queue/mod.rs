//! Job queue and admission gate
//!
//! Two separate bounds: [`JobQueue`] limits how many jobs may wait,
//! [`AdmissionController`] limits how many may print at once.

mod admission;
mod job_queue;

pub use admission::{AdmissionController, AdmissionError, AdmissionPermit};
pub use job_queue::{JobQueue, QueueError};
