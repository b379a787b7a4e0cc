//! Print Server - receipt printing for live coding events
//!
//! Teams upload an interpreter script, then send print requests. Requests
//! are normalized into printer commands, queued, and printed one admission
//! slot at a time on a mock or hardware receipt printer.
//!
//! # Module layout
//!
//! ```text
//! print-server/src/
//! ├── core/       # configuration, state, service boundary, tasks
//! ├── auth/       # admin token guard
//! ├── teams/      # team registry
//! ├── queue/      # bounded job queue, admission gate
//! ├── printing/   # normalizer, script interpreter, dispatcher
//! └── utils/      # logging
//! ```

pub mod auth;
pub mod core;
pub mod printing;
pub mod queue;
pub mod teams;
pub mod utils;

// Re-exports
pub use core::{AdminHandle, BackgroundTasks, Config, PrintService, PrintState};
pub use printing::{ExecutionResult, InterpreterEngine, Normalizer, RejectionReason};
pub use queue::{AdmissionController, JobQueue};
pub use teams::TeamRegistry;
pub use utils::{init_logger, init_logger_with_file};

// Re-export unified error types from shared
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};

// Security logging macro - supports tracing format specifiers
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
    ____       _       __
   / __ \_____(_)___  / /_
  / /_/ / ___/ / __ \/ __/
 / ____/ /  / / / / / /_
/_/   /_/  /_/_/ /_/\__/
    "#
    );
}
