//! Shared types for the receipt print server
//!
//! Error codes and response envelopes used at every boundary, plus the
//! domain models (teams, print jobs, printer commands, statistics).

pub mod error;
pub mod models;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use models::{
    CompilationStatus, JobStatus, PrintJob, PrinterCommand, QueueStatus, ServerStatistics, Team,
    TeamSummary,
};
