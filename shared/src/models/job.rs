//! Print Job Model

use super::command::PrinterCommand;
use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Print job lifecycle
///
/// ```text
/// Queued -> Printing -> Completed
///                    -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Printing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Only forward moves are legal
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Printing)
                | (Self::Printing, Self::Completed)
                | (Self::Printing, Self::Failed)
        )
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal job transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl From<TransitionError> for crate::error::AppError {
    fn from(err: TransitionError) -> Self {
        crate::error::AppError::with_message(
            ErrorCode::InvalidJobTransition,
            err.to_string(),
        )
    }
}

/// One team's request to print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: String,
    pub team_id: String,
    pub team_name: String,
    pub commands: Vec<PrinterCommand>,
    pub submitted_at: i64,
    pub status: JobStatus,
    /// 1-based position, present only while queued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Classifies `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
}

impl PrintJob {
    /// Create a queued job with a fresh random id
    pub fn new(
        team_id: impl Into<String>,
        team_name: impl Into<String>,
        commands: Vec<PrinterCommand>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            team_id: team_id.into(),
            team_name: team_name.into(),
            commands,
            submitted_at: super::now_millis(),
            status: JobStatus::Queued,
            queue_position: None,
            error: None,
            error_code: None,
            finished_at: None,
        }
    }

    /// Move to `next`, refusing anything but a forward step
    pub fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.queue_position = None;
        if next.is_terminal() {
            self.finished_at = Some(super::now_millis());
        }
        Ok(())
    }

    /// Mark the job completed
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Completed)
    }

    /// Mark the job failed with a classified reason
    pub fn fail(&mut self, code: ErrorCode, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.error_code = Some(code);
        Ok(())
    }
}
