//! Print service boundary
//!
//! The operations a caller (HTTP layer, dashboard, CLI) uses. Every input
//! error comes back as an [`AppError`] with a specific code; nothing here
//! panics or blocks on the printer.

use receipt_printer::{BackendInitError, ReceiptLog};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CompilationStatus, JobStatus, PrintJob, QueueStatus, ServerStatistics, Team, TeamSummary,
};
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::state::PrintState;
use super::tasks::{BackgroundTasks, TaskKind};
use super::Config;
use crate::printing::{DispatchWorker, Program};
use crate::security_log;

const MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Facade over [`PrintState`]
#[derive(Clone)]
pub struct PrintService {
    state: PrintState,
}

impl PrintService {
    pub fn new(state: PrintState) -> Self {
        Self { state }
    }

    /// Build the service, probing the configured printer
    pub async fn initialize(config: &Config) -> Self {
        Self::new(PrintState::initialize(config).await)
    }

    pub fn state(&self) -> &PrintState {
        &self.state
    }

    /// Spawn the configured number of dispatcher workers
    pub fn start_dispatchers(&self, tasks: &mut BackgroundTasks) {
        let workers = self.state.config.dispatcher_workers;
        for id in 0..workers {
            let worker = DispatchWorker::new(id, self.state.clone());
            let shutdown = tasks.shutdown_token();
            tasks.spawn(
                format!("dispatcher-{id}"),
                TaskKind::Dispatcher,
                worker.run(shutdown),
            );
        }
        info!(
            workers,
            max_concurrent = self.state.admission.max_concurrent(),
            "Dispatchers started"
        );
    }

    /// Periodically log queue and job counters
    pub fn start_monitor(&self, tasks: &mut BackgroundTasks) {
        let service = self.clone();
        let shutdown = tasks.shutdown_token();
        tasks.spawn("stats-monitor", TaskKind::Periodic, async move {
            let mut interval = tokio::time::interval(MONITOR_INTERVAL);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let stats = service.statistics();
                        info!(
                            queue_size = stats.queue_size,
                            active_jobs = stats.active_jobs,
                            succeeded = stats.jobs_succeeded,
                            failed = stats.jobs_failed,
                            "Print server status"
                        );
                    }
                }
            }
        });
    }

    /// Register or update a team and validate its script
    ///
    /// The team is stored even when validation fails; the error carries the
    /// team id under `team_id`. A blank script selects direct mode and is not
    /// validated.
    #[instrument(skip(self, script), fields(script_len = script.len()))]
    pub fn submit(&self, display_name: &str, script: &str) -> AppResult<String> {
        let registry = &self.state.registry;
        let team_id = registry.register(display_name, script)?;

        if script.trim().is_empty() {
            registry.record_upload(&team_id, CompilationStatus::Unknown, None)?;
            return Ok(team_id);
        }

        match Program::compile(script, self.state.config.max_script_statements) {
            Ok(program) => {
                registry.record_upload(&team_id, CompilationStatus::Success, None)?;
                info!(team_id = %team_id, statements = program.len(), "Script accepted");
                Ok(team_id)
            }
            Err(e) => {
                registry.record_upload(&team_id, CompilationStatus::Failed, Some(e.to_string()))?;
                warn!(team_id = %team_id, error = %e, "Script rejected");
                Err(AppError::from(e).with_detail("team_id", team_id))
            }
        }
    }

    /// Normalize a raw print request and queue it, returning the job id
    #[instrument(skip(self, raw), fields(body_len = raw.len()))]
    pub fn ingest_print_request(&self, team_id: &str, raw: &[u8]) -> AppResult<String> {
        let team = self.state.registry.get(team_id)?;
        if !team.printer_enabled {
            return Err(AppError::new(ErrorCode::PrinterNotEnabled).with_detail("team_id", team_id));
        }

        let commands = self.state.normalizer.normalize(raw, team_id)?;
        let job = PrintJob::new(team.id.as_str(), team.display_name.as_str(), commands);
        let job_id = job.id.clone();
        let command_count = job.commands.len();
        let position = self.enqueue_for_team(team_id, job)?;

        self.state.counters.record_submitted();
        info!(job_id = %job_id, position, command_count, "Print request queued");
        Ok(job_id)
    }

    /// Queue `job` and count it for its team
    ///
    /// A team deleted after the lookup but before the enqueue had no job to
    /// drop, so the job is withdrawn here and the request fails.
    fn enqueue_for_team(&self, team_id: &str, job: PrintJob) -> AppResult<usize> {
        let job_id = job.id.clone();
        let position = self.state.queue.enqueue(job)?;

        if let Err(e) = self.state.registry.record_job(team_id) {
            let withdrawn = self.state.queue.withdraw(&job_id).is_some();
            warn!(job_id = %job_id, withdrawn, "Team deleted while its job was being queued");
            return Err(e);
        }
        Ok(position)
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.state.queue.status()
    }

    pub fn statistics(&self) -> ServerStatistics {
        let state = &self.state;
        ServerStatistics {
            total_teams: state.registry.len(),
            printer_enabled_teams: state.registry.printer_enabled_count(),
            total_uploads: state.registry.total_uploads(),
            jobs_submitted: state.counters.submitted(),
            jobs_succeeded: state.counters.succeeded(),
            jobs_failed: state.counters.failed(),
            jobs_cancelled: state.queue.cancelled_count(),
            queue_size: state.queue.len(),
            queue_capacity: state.queue.capacity(),
            active_jobs: state.admission.active(),
            available_slots: state.admission.available(),
            total_processed: state.counters.processed(),
            hardware_printer: state.backends.has_hardware(),
        }
    }

    pub fn list_teams(&self) -> Vec<TeamSummary> {
        self.state.registry.list()
    }

    /// A queued job, or one that already ran
    pub fn get_job(&self, job_id: &str) -> AppResult<PrintJob> {
        self.state
            .queue
            .get(job_id)
            .or_else(|| self.state.history.get(job_id))
            .ok_or_else(|| AppError::job_not_found(job_id))
    }

    /// Status of a job, if the server knows it
    pub fn job_status(&self, job_id: &str) -> AppResult<JobStatus> {
        self.get_job(job_id).map(|job| job.status)
    }

    /// Receipts rendered by the mock backend
    pub fn receipts(&self) -> ReceiptLog {
        self.state.backends.receipts.clone()
    }

    /// Why the hardware printer is not in use, if it is not
    pub fn printer_diagnostic(&self) -> Option<&BackendInitError> {
        self.state.backends.init_error.as_ref()
    }

    /// `Ok` when a hardware printer is attached
    ///
    /// Otherwise a [`ErrorCode::PrinterNotAvailable`] error carrying the
    /// fallback reason and its remediation steps.
    pub fn hardware_status(&self) -> AppResult<()> {
        if self.state.backends.has_hardware() {
            return Ok(());
        }
        Err(match self.printer_diagnostic() {
            Some(diagnostic) => AppError::from(diagnostic),
            None => AppError::new(ErrorCode::PrinterNotAvailable),
        })
    }

    /// Unlock the admin operations with the shared token
    pub fn admin(&self, token: &str) -> AppResult<AdminHandle<'_>> {
        self.state.admin.verify(token)?;
        Ok(AdminHandle { state: &self.state })
    }
}

/// Admin operations, only reachable through [`PrintService::admin`]
pub struct AdminHandle<'a> {
    state: &'a PrintState,
}

impl AdminHandle<'_> {
    pub fn set_printer_enabled(&self, team_id: &str, enabled: bool) -> AppResult<()> {
        self.state.registry.set_printer_enabled(team_id, enabled)?;
        security_log!("INFO", "printer_access_changed", team_id = team_id, enabled = enabled);
        Ok(())
    }

    /// Remove a team and its queued jobs
    pub fn delete_team(&self, team_id: &str) -> bool {
        let deleted = self.state.registry.delete(team_id);
        if deleted {
            security_log!("INFO", "team_deleted", team_id = team_id);
        }
        deleted
    }

    /// Drop every team, queued job and job record
    pub fn clear_all(&self) -> usize {
        let teams = self.state.registry.clear();
        self.state.history.clear();
        self.state.backends.receipts.clear();
        security_log!("WARN", "all_data_cleared", teams = teams);
        teams
    }

    /// Full team record, stored script included
    pub fn team_detail(&self, team_id: &str) -> AppResult<Team> {
        self.state.registry.get(team_id)
    }

    /// Waiting jobs in print order
    pub fn queued_jobs(&self) -> Vec<PrintJob> {
        self.state.queue.snapshot()
    }
}
