//! Interpreter execution engine
//!
//! Drives one job against one backend. A team with a stored script runs in
//! script mode (the script is translated into commands); otherwise the job's
//! own normalized commands are replayed as-is.
//!
//! Failures stay inside the job: a backend error or a panic ends the job as
//! [`ExecutionResult::Failed`] after a diagnostic receipt is printed, and a
//! script that does not validate never touches the backend. Output the job
//! buffered before it failed is discarded, never printed.

use super::script::{Program, ScriptValidationError};
use crate::core::tasks::panic_message;
use futures::FutureExt;
use receipt_printer::{PrintResult, PrinterCapability, QrCodeOptions, TextSize, TextStyle};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{PrintJob, PrinterCommand, Team};
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ExecutionResult {
    Completed,
    Failed {
        error: String,
        code: ErrorCode,
        /// Whether the diagnostic receipt reached the backend
        diagnostic_printed: bool,
    },
    /// The stored script is structurally invalid; nothing was printed
    Rejected { error: String },
}

impl ExecutionResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Failure text recorded on the job
    pub fn error(&self) -> Option<&str> {
        self.failure().map(|(_, error)| error)
    }

    /// Error code and text of a job that did not complete
    pub fn failure(&self) -> Option<(ErrorCode, &str)> {
        match self {
            Self::Completed => None,
            Self::Failed { error, code, .. } => Some((*code, error)),
            Self::Rejected { error } => Some((ErrorCode::ScriptInvalid, error)),
        }
    }
}

enum RunError {
    Rejected(ScriptValidationError),
    Failed(AppError),
}

/// Executes jobs against a [`PrinterCapability`]
#[derive(Debug, Clone)]
pub struct InterpreterEngine {
    max_statements: usize,
}

impl Default for InterpreterEngine {
    fn default() -> Self {
        Self::new(512)
    }
}

impl InterpreterEngine {
    pub fn new(max_statements: usize) -> Self {
        Self { max_statements }
    }

    /// Run `job` for `team` on `backend`
    #[instrument(skip_all, fields(job_id = %job.id, team_id = %team.id, backend = ?backend.kind()))]
    pub async fn execute(
        &self,
        team: &Team,
        job: &PrintJob,
        backend: &mut dyn PrinterCapability,
    ) -> ExecutionResult {
        let run = AssertUnwindSafe(self.run(team, job, &mut *backend))
            .catch_unwind()
            .await;

        let failure = match run {
            Ok(Ok(())) => {
                info!("Print job completed");
                return ExecutionResult::Completed;
            }
            Ok(Err(RunError::Rejected(e))) => {
                warn!(error = %e, "Stored script failed validation");
                return ExecutionResult::Rejected {
                    error: e.to_string(),
                };
            }
            Ok(Err(RunError::Failed(err))) => err,
            Err(panic) => AppError::internal(format!(
                "Interpreter crashed: {}",
                panic_message(panic.as_ref())
            )),
        };
        let AppError { code, message: error, .. } = failure;

        error!(error = %error, %code, "Print job failed, printing diagnostic receipt");
        // Whatever the job buffered before failing must not reach the paper
        backend.discard();
        let printed = AssertUnwindSafe(print_diagnostic(backend, &error))
            .catch_unwind()
            .await;
        let diagnostic_printed = match printed {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Diagnostic receipt could not be printed");
                false
            }
            Err(_) => {
                warn!("Diagnostic receipt panicked");
                false
            }
        };

        ExecutionResult::Failed {
            error,
            code,
            diagnostic_printed,
        }
    }

    async fn run(
        &self,
        team: &Team,
        job: &PrintJob,
        backend: &mut dyn PrinterCapability,
    ) -> Result<(), RunError> {
        let mut commands = if team.has_script() {
            let program =
                Program::compile(&team.script, self.max_statements).map_err(RunError::Rejected)?;
            debug!(statements = program.len(), "Running team script");
            program.translate().map_err(|e| {
                RunError::Failed(AppError::with_message(ErrorCode::ScriptInvalid, e.to_string()))
            })?
        } else {
            job.commands.clone()
        };

        if !commands.last().is_some_and(PrinterCommand::is_cut) {
            commands.push(PrinterCommand::FeedLines { lines: 2 });
            commands.push(PrinterCommand::Cut);
        }

        replay(backend, &commands)
            .await
            .map_err(|e| RunError::Failed(AppError::from(e)))
    }
}

/// Issue one capability call per command
async fn replay(backend: &mut dyn PrinterCapability, commands: &[PrinterCommand]) -> PrintResult<()> {
    for command in commands {
        match command {
            PrinterCommand::Text { content, style } => backend.add_text(content, *style)?,
            PrinterCommand::SetStyle {
                bold,
                underline,
                size,
            } => backend.set_style(TextStyle {
                bold: *bold,
                underline: *underline,
                size: *size,
            })?,
            PrinterCommand::SetAlign { alignment } => backend.set_align(*alignment)?,
            PrinterCommand::Barcode {
                data,
                symbology,
                options,
            } => backend.add_barcode(data, *symbology, *options)?,
            PrinterCommand::QrCode {
                data,
                size,
                error_correction,
            } => backend.add_qr_code(
                data,
                QrCodeOptions {
                    size: *size,
                    error_correction: *error_correction,
                },
            )?,
            PrinterCommand::Image { data, options } => backend.add_image(data, *options)?,
            PrinterCommand::FeedLines { lines } => backend.feed_lines(*lines)?,
            PrinterCommand::Cut => backend.cut().await?,
            PrinterCommand::Unknown { raw_type } => {
                warn!(command_type = %raw_type, "Skipping unknown command");
            }
        }
    }
    Ok(())
}

async fn print_diagnostic(backend: &mut dyn PrinterCapability, error: &str) -> PrintResult<()> {
    backend.add_text(
        "INTERPRETER ERROR",
        Some(TextStyle::bold().with_size(TextSize::Large)),
    )?;
    backend.feed_lines(1)?;
    backend.add_text(&format!("Error: {error}"), None)?;
    backend.feed_lines(2)?;
    backend.add_text("Please check your code and try again", None)?;
    backend.feed_lines(3)?;
    backend.cut().await
}
