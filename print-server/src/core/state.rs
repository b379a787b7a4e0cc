use dashmap::DashMap;
use receipt_printer::{
    BackendInitError, MockPrinter, ReceiptLog, SharedPrinter, create_backend,
};
use shared::models::{PrintJob, Team};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::auth::AdminGuard;
use crate::core::Config;
use crate::printing::{InterpreterEngine, Normalizer};
use crate::queue::{AdmissionController, JobQueue};
use crate::teams::TeamRegistry;

/// The printers jobs can run on
///
/// The mock is always present. The hardware printer is used only for teams
/// with printing enabled.
#[derive(Clone)]
pub struct Backends {
    pub mock: SharedPrinter,
    pub hardware: Option<SharedPrinter>,
    /// Receipts rendered by the mock
    pub receipts: ReceiptLog,
    /// Why the hardware printer is not in use, if it is not
    pub init_error: Option<BackendInitError>,
}

impl Backends {
    /// Mock only
    pub fn mock(paper_width: usize) -> Self {
        let receipts = ReceiptLog::new();
        Self {
            mock: receipt_printer::shared(MockPrinter::with_log(paper_width, receipts.clone())),
            hardware: None,
            receipts,
            init_error: None,
        }
    }

    /// Mock plus an explicit hardware backend
    pub fn with_hardware(paper_width: usize, hardware: SharedPrinter) -> Self {
        Self {
            hardware: Some(hardware),
            ..Self::mock(paper_width)
        }
    }

    /// Probe the configured printer address
    pub async fn detect(config: &Config) -> Self {
        let receipts = ReceiptLog::new();
        let init = create_backend(
            config.printer_address.as_deref(),
            config.session_config(),
            receipts.clone(),
        )
        .await;

        if init.is_real {
            Self {
                mock: receipt_printer::shared(MockPrinter::with_log(config.paper_width, receipts.clone())),
                hardware: Some(init.printer),
                receipts,
                init_error: None,
            }
        } else {
            Self {
                mock: init.printer,
                hardware: None,
                receipts,
                init_error: init.error,
            }
        }
    }

    /// Printer for a job of `team`
    pub fn select(&self, team: &Team) -> SharedPrinter {
        match &self.hardware {
            Some(hardware) if team.printer_enabled => hardware.clone(),
            _ => self.mock.clone(),
        }
    }

    pub fn has_hardware(&self) -> bool {
        self.hardware.is_some()
    }
}

/// Jobs that left the queue, by id
#[derive(Debug, Default)]
pub struct JobHistory {
    jobs: DashMap<String, PrintJob>,
}

impl JobHistory {
    pub fn record(&self, job: &PrintJob) {
        self.jobs.insert(job.id.clone(), job.clone());
    }

    pub fn get(&self, job_id: &str) -> Option<PrintJob> {
        self.jobs.get(job_id).map(|j| j.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn clear(&self) {
        self.jobs.clear();
    }
}

/// Job outcome counters
#[derive(Debug, Default)]
pub struct JobCounters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl JobCounters {
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a finished job
    pub fn record_outcome(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.succeeded
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.succeeded() + self.failed()
    }
}

/// Print server state - shared handles to every component
///
/// Cloning is cheap; every component sits behind an `Arc`.
///
/// | Field | Purpose |
/// |-------|---------|
/// | config | Configuration (immutable) |
/// | registry | Team records |
/// | queue | Waiting jobs |
/// | admission | Concurrency gate |
/// | backends | Mock and hardware printers |
/// | history | Jobs that left the queue |
/// | counters | Outcome counters |
#[derive(Clone)]
pub struct PrintState {
    pub config: Config,
    pub registry: Arc<TeamRegistry>,
    pub queue: Arc<JobQueue>,
    pub admission: Arc<AdmissionController>,
    pub backends: Backends,
    pub history: Arc<JobHistory>,
    pub counters: Arc<JobCounters>,
    pub normalizer: Normalizer,
    pub engine: InterpreterEngine,
    pub admin: AdminGuard,
}

impl PrintState {
    /// Build the state with explicit backends
    pub fn new(config: Config, backends: Backends) -> Self {
        let config = config.normalized();
        let queue = Arc::new(JobQueue::new(config.queue_capacity));
        Self {
            registry: Arc::new(TeamRegistry::new(queue.clone())),
            queue,
            admission: Arc::new(AdmissionController::new(config.max_concurrent_jobs)),
            backends,
            history: Arc::new(JobHistory::default()),
            counters: Arc::new(JobCounters::default()),
            normalizer: Normalizer::new(config.max_body_bytes, config.max_commands),
            engine: InterpreterEngine::new(config.max_script_statements),
            admin: AdminGuard::new(config.admin_token.clone()),
            config,
        }
    }

    /// Build the state, probing the configured printer
    pub async fn initialize(config: &Config) -> Self {
        let backends = Backends::detect(config).await;
        if let Some(error) = &backends.init_error {
            tracing::warn!(
                kind = ?error.kind,
                message = %error.message,
                details = ?error.details,
                "Hardware printer unavailable, using mock"
            );
        }
        Self::new(config.clone(), backends)
    }

    /// Dequeue the next job and record it as printing in the history
    ///
    /// Both happen under the queue lock, so a lookup by id always finds the
    /// job in one of the two.
    pub fn take_next_job(&self) -> Option<PrintJob> {
        self.queue.dequeue_with(|job| self.history.record(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_backend() {
        let hardware = receipt_printer::shared(MockPrinter::new(10));
        let backends = Backends::with_hardware(10, hardware.clone());
        let mut team = Team::new("a".into(), "A", "", 0);

        assert!(Arc::ptr_eq(&backends.select(&team), &backends.mock));
        team.printer_enabled = true;
        assert!(Arc::ptr_eq(&backends.select(&team), &hardware));

        let mock_only = Backends::mock(10);
        assert!(Arc::ptr_eq(&mock_only.select(&team), &mock_only.mock));
    }

    #[tokio::test]
    async fn test_initialize_without_printer_uses_mock() {
        let config = Config {
            printer_address: None,
            ..Config::default()
        };
        let state = PrintState::initialize(&config).await;
        assert!(!state.backends.has_hardware());
        assert!(state.backends.init_error.is_some());
        assert_eq!(state.queue.capacity(), config.queue_capacity.max(1));
    }

    #[test]
    fn test_take_next_job_records_history() {
        let state = PrintState::new(Config::default(), Backends::mock(32));
        assert!(state.take_next_job().is_none());

        let job = PrintJob::new("a", "A", vec![]);
        let id = job.id.clone();
        state.queue.enqueue(job).unwrap();

        let taken = state.take_next_job().unwrap();
        assert_eq!(taken.id, id);
        assert!(state.queue.is_empty());
        assert_eq!(
            state.history.get(&id).map(|j| j.status),
            Some(shared::models::JobStatus::Printing)
        );
    }
}
