//! Bounded FIFO job queue
//!
//! Holds jobs that are waiting to print. The capacity bound is enforced on
//! enqueue: a full queue refuses the job immediately and stays untouched.
//! Positions are 1-based and renumbered under the same lock as every
//! mutation, so no observer ever sees a stale or sparse numbering.

use parking_lot::Mutex;
use shared::error::{AppError, ErrorCode};
use shared::models::{JobStatus, PrintJob, QueueStatus};
use std::collections::VecDeque;
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Print queue is full ({capacity} jobs waiting)")]
    Full { capacity: usize },

    #[error("Job {job_id} is {status:?}, only queued jobs can be enqueued")]
    NotQueued { job_id: String, status: JobStatus },
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match &err {
            QueueError::Full { capacity } => {
                AppError::with_message(ErrorCode::QueueFull, err.to_string())
                    .with_detail("capacity", *capacity)
            }
            QueueError::NotQueued { job_id, .. } => {
                AppError::with_message(ErrorCode::InvalidJobTransition, err.to_string())
                    .with_detail("job_id", job_id.clone())
            }
        }
    }
}

/// Bounded job queue shared by producers and dispatchers
#[derive(Debug)]
pub struct JobQueue {
    capacity: usize,
    jobs: Mutex<VecDeque<PrintJob>>,
    notify: Notify,
    cancelled: AtomicU64,
}

fn renumber(jobs: &mut VecDeque<PrintJob>) {
    for (i, job) in jobs.iter_mut().enumerate() {
        job.queue_position = Some(i + 1);
    }
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            jobs: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            cancelled: AtomicU64::new(0),
        }
    }

    /// Append a job, returning its 1-based position
    pub fn enqueue(&self, mut job: PrintJob) -> Result<usize, QueueError> {
        if job.status != JobStatus::Queued {
            return Err(QueueError::NotQueued {
                job_id: job.id,
                status: job.status,
            });
        }

        let position = {
            let mut jobs = self.jobs.lock();
            if jobs.len() >= self.capacity {
                warn!(job_id = %job.id, capacity = self.capacity, "Queue full, rejecting job");
                return Err(QueueError::Full {
                    capacity: self.capacity,
                });
            }
            let position = jobs.len() + 1;
            job.queue_position = Some(position);
            debug!(job_id = %job.id, team_id = %job.team_id, position, "Job queued");
            jobs.push_back(job);
            position
        };

        self.notify.notify_one();
        Ok(position)
    }

    /// Pop the oldest job and mark it printing
    pub fn dequeue(&self) -> Option<PrintJob> {
        self.dequeue_with(|_| {})
    }

    /// Pop the oldest job, mark it printing and pass it to `on_dequeue`
    ///
    /// `on_dequeue` runs before the queue lock is released, so a job can be
    /// handed to another store without ever being visible in neither.
    /// It must not call back into the queue.
    pub fn dequeue_with(&self, on_dequeue: impl FnOnce(&PrintJob)) -> Option<PrintJob> {
        let mut jobs = self.jobs.lock();
        let mut job = jobs.pop_front()?;
        renumber(&mut jobs);

        if let Err(e) = job.transition(JobStatus::Printing) {
            // Only queued jobs are ever admitted, so this is a bug upstream
            warn!(job_id = %job.id, error = %e, "Dequeued job was not queued");
        }
        on_dequeue(&job);
        Some(job)
    }

    /// Take back a job that was just queued, without counting it as cancelled
    pub fn withdraw(&self, job_id: &str) -> Option<PrintJob> {
        let mut jobs = self.jobs.lock();
        let index = jobs.iter().position(|j| j.id == job_id)?;
        let job = jobs.remove(index)?;
        renumber(&mut jobs);
        debug!(job_id, "Job withdrawn");
        Some(job)
    }

    /// Resolve once the queue holds at least one job
    pub async fn wait_for_job(&self) {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            if !self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Drop every queued job of `team_id`, returning how many were removed
    pub fn remove_team(&self, team_id: &str) -> usize {
        let removed = {
            let mut jobs = self.jobs.lock();
            let before = jobs.len();
            jobs.retain(|job| job.team_id != team_id);
            let removed = before - jobs.len();
            if removed > 0 {
                renumber(&mut jobs);
            }
            removed
        };

        if removed > 0 {
            self.cancelled.fetch_add(removed as u64, Ordering::Relaxed);
            info!(team_id, removed, "Removed queued jobs for team");
        }
        removed
    }

    /// Drop every queued job
    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.jobs.lock()).len();
        self.cancelled.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus::new(self.len(), self.capacity)
    }

    /// Copy of the waiting jobs in FIFO order
    pub fn snapshot(&self) -> Vec<PrintJob> {
        self.jobs.lock().iter().cloned().collect()
    }

    /// A waiting job by id
    pub fn get(&self, job_id: &str) -> Option<PrintJob> {
        self.jobs.lock().iter().find(|j| j.id == job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jobs removed before they could print
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PrinterCommand;
    use std::sync::Arc;
    use std::time::Duration;

    fn job(team: &str) -> PrintJob {
        PrintJob::new(team, team, vec![PrinterCommand::text("x")])
    }

    fn positions(queue: &JobQueue) -> Vec<usize> {
        queue
            .snapshot()
            .iter()
            .map(|j| j.queue_position.unwrap())
            .collect()
    }

    #[test]
    fn test_fifo_with_dense_positions() {
        let queue = JobQueue::new(5);
        let ids: Vec<String> = (0..3)
            .map(|_| {
                let j = job("a");
                let id = j.id.clone();
                queue.enqueue(j).unwrap();
                id
            })
            .collect();
        assert_eq!(positions(&queue), vec![1, 2, 3]);

        let first = queue.dequeue().unwrap();
        assert_eq!(first.id, ids[0]);
        assert_eq!(first.status, JobStatus::Printing);
        assert!(first.queue_position.is_none());
        assert_eq!(positions(&queue), vec![1, 2]);
        assert_eq!(queue.snapshot()[0].id, ids[1]);
    }

    #[test]
    fn test_full_queue_rejects_without_mutation() {
        let queue = JobQueue::new(2);
        queue.enqueue(job("a")).unwrap();
        queue.enqueue(job("b")).unwrap();
        let before = queue.snapshot();

        assert_eq!(
            queue.enqueue(job("c")),
            Err(QueueError::Full { capacity: 2 })
        );
        assert_eq!(queue.snapshot(), before);
        assert!(queue.status().is_full);

        let err: AppError = QueueError::Full { capacity: 2 }.into();
        assert_eq!(err.code, ErrorCode::QueueFull);
    }

    #[test]
    fn test_only_queued_jobs_enter() {
        let queue = JobQueue::new(2);
        let mut printing = job("a");
        printing.transition(JobStatus::Printing).unwrap();
        assert!(matches!(
            queue.enqueue(printing),
            Err(QueueError::NotQueued { .. })
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_hook_sees_printing_job() {
        let queue = JobQueue::new(5);
        let first = job("a");
        let id = first.id.clone();
        queue.enqueue(first).unwrap();
        queue.enqueue(job("b")).unwrap();

        let mut seen = None;
        let taken = queue
            .dequeue_with(|j| seen = Some((j.id.clone(), j.status)))
            .unwrap();
        assert_eq!(taken.id, id);
        assert_eq!(seen, Some((id, JobStatus::Printing)));
        assert_eq!(positions(&queue), vec![1]);

        queue.dequeue().unwrap();
        let mut called = false;
        assert!(queue.dequeue_with(|_| called = true).is_none());
        assert!(!called);
    }

    #[test]
    fn test_withdraw_is_not_a_cancellation() {
        let queue = JobQueue::new(5);
        let ids: Vec<String> = (0..3)
            .map(|_| {
                let j = job("a");
                let id = j.id.clone();
                queue.enqueue(j).unwrap();
                id
            })
            .collect();

        assert_eq!(queue.withdraw(&ids[1]).unwrap().id, ids[1]);
        assert!(queue.withdraw(&ids[1]).is_none());
        assert_eq!(positions(&queue), vec![1, 2]);
        assert_eq!(queue.cancelled_count(), 0);
    }

    #[test]
    fn test_remove_team_renumbers() {
        let queue = JobQueue::new(10);
        for team in ["a", "b", "a", "c", "b"] {
            queue.enqueue(job(team)).unwrap();
        }
        assert_eq!(queue.remove_team("b"), 2);
        assert_eq!(queue.len(), 3);
        assert_eq!(positions(&queue), vec![1, 2, 3]);
        assert!(queue.snapshot().iter().all(|j| j.team_id != "b"));
        assert_eq!(queue.cancelled_count(), 2);
        assert_eq!(queue.remove_team("zzz"), 0);
    }

    #[test]
    fn test_concurrent_producers_respect_capacity() {
        let queue = Arc::new(JobQueue::new(25));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .filter(|_| queue.enqueue(job(&format!("t{t}"))).is_ok())
                        .count()
                })
            })
            .collect();
        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 25);
        assert_eq!(queue.len(), 25);
        assert_eq!(positions(&queue), (1..=25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_wait_for_job_wakes_on_enqueue() {
        let queue = Arc::new(JobQueue::new(3));
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.wait_for_job().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        queue.enqueue(job("a")).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
