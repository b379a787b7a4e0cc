//! Print dispatcher
//!
//! Pulls jobs off the queue and runs them through the interpreter engine,
//! one admission slot per job. Several workers may share one state; the
//! admission gate decides how many of them print at once.

use crate::core::PrintState;
use shared::error::ErrorCode;
use shared::models::PrintJob;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::engine::ExecutionResult;
use crate::queue::AdmissionError;

/// One dispatcher loop
pub struct DispatchWorker {
    id: usize,
    state: PrintState,
}

impl DispatchWorker {
    pub fn new(id: usize, state: PrintState) -> Self {
        Self { id, state }
    }

    /// Run until `shutdown` is cancelled
    ///
    /// A job that was already dequeued finishes before the loop exits.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(worker = self.id, "Dispatch worker started");
        let timeout = self.state.config.admission_timeout();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.state.queue.wait_for_job() => {}
            }

            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = self.state.admission.acquire(timeout) => permit,
            };
            let permit = match permit {
                Ok(permit) => permit,
                Err(AdmissionError::Timeout(waited)) => {
                    debug!(worker = self.id, ?waited, "No admission slot yet, retrying");
                    continue;
                }
                Err(AdmissionError::Closed) => {
                    warn!(worker = self.id, "Admission gate closed, worker stopping");
                    break;
                }
            };

            // Another worker may have taken the job while we waited for a slot
            let Some(job) = self.state.take_next_job() else {
                permit.release();
                continue;
            };
            process_job(&self.state, job).await;
            permit.release();
        }

        info!(worker = self.id, "Dispatch worker stopped");
    }
}

/// Run one dequeued job to a terminal status
///
/// The job must come from [`PrintState::take_next_job`]. Its final state is
/// written to the job history and the outcome counters.
pub async fn process_job(state: &PrintState, mut job: PrintJob) -> PrintJob {
    let outcome = match state.registry.get(&job.team_id) {
        Ok(team) => {
            let printer = state.backends.select(&team);
            let mut backend = printer.lock().await;
            state.engine.execute(&team, &job, &mut **backend).await
        }
        Err(_) => {
            warn!(job_id = %job.id, team_id = %job.team_id, "Team deleted before its job ran");
            ExecutionResult::Failed {
                error: "team deleted".to_string(),
                code: ErrorCode::TeamNotFound,
                diagnostic_printed: false,
            }
        }
    };

    let finished = match outcome.failure() {
        None => job.complete(),
        Some((code, reason)) => {
            debug!(job_id = %job.id, %code, "Recording job failure");
            job.fail(code, reason)
        }
    };
    if let Err(e) = finished {
        error!(job_id = %job.id, error = %e, "Job could not be finalized");
    }

    state.counters.record_outcome(outcome.is_completed());
    state.history.record(&job);
    job
}

/// Run the next queued job, if any, waiting for an admission slot
pub async fn dispatch_next(state: &PrintState) -> Result<Option<PrintJob>, AdmissionError> {
    let permit = state
        .admission
        .acquire(state.config.admission_timeout())
        .await?;
    let Some(job) = state.take_next_job() else {
        return Ok(None);
    };
    let job = process_job(state, job).await;
    permit.release();
    Ok(Some(job))
}
