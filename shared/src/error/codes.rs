//! Unified error codes for the print server
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Team errors
//! - 4xxx: Job and queue errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as `u16` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,

    // ==================== 1xxx: Auth ====================
    /// No admin token presented
    NotAuthenticated = 1001,
    /// Admin token does not match
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// The team's printer access has not been enabled
    PrinterNotEnabled = 2101,

    // ==================== 3xxx: Team ====================
    TeamNotFound = 3001,
    /// Display name yields an empty team id
    InvalidTeamName = 3002,
    /// Script failed validation
    ScriptInvalid = 3003,

    // ==================== 4xxx: Job / Queue ====================
    JobNotFound = 4001,
    /// Queue is at capacity
    QueueFull = 4002,
    /// Submission body matched no known shape
    MalformedSubmission = 4003,
    /// Submission body or command list over the limit
    SubmissionTooLarge = 4004,
    /// Job status may only move forward
    InvalidJobTransition = 4005,
    /// No admission slot became free in time
    AdmissionTimeout = 4006,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    /// The printer could not be reached or is not configured
    PrinterNotAvailable = 9201,
    /// The printer was reached but the receipt did not print
    PrintFailed = 9202,
    SystemBusy = 9404,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",

            // Auth
            ErrorCode::NotAuthenticated => "Admin token required",
            ErrorCode::TokenInvalid => "Admin token is invalid",

            // Permission
            ErrorCode::PrinterNotEnabled => "Printer access is not enabled for this team",

            // Team
            ErrorCode::TeamNotFound => "Team not found",
            ErrorCode::InvalidTeamName => "Team name is invalid",
            ErrorCode::ScriptInvalid => "Interpreter script is invalid",

            // Job / Queue
            ErrorCode::JobNotFound => "Print job not found",
            ErrorCode::QueueFull => "Print queue is full, please retry later",
            ErrorCode::MalformedSubmission => "Print request could not be understood",
            ErrorCode::SubmissionTooLarge => "Print request is too large",
            ErrorCode::InvalidJobTransition => "Illegal print job status change",
            ErrorCode::AdmissionTimeout => "Timed out waiting for a print slot",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::PrinterNotAvailable => "Printer is not available",
            ErrorCode::PrintFailed => "Print operation failed",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2101 => Ok(ErrorCode::PrinterNotEnabled),

            // Team
            3001 => Ok(ErrorCode::TeamNotFound),
            3002 => Ok(ErrorCode::InvalidTeamName),
            3003 => Ok(ErrorCode::ScriptInvalid),

            // Job / Queue
            4001 => Ok(ErrorCode::JobNotFound),
            4002 => Ok(ErrorCode::QueueFull),
            4003 => Ok(ErrorCode::MalformedSubmission),
            4004 => Ok(ErrorCode::SubmissionTooLarge),
            4005 => Ok(ErrorCode::InvalidJobTransition),
            4006 => Ok(ErrorCode::AdmissionTimeout),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9201 => Ok(ErrorCode::PrinterNotAvailable),
            9202 => Ok(ErrorCode::PrintFailed),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::Success,
        ErrorCode::NotAuthenticated,
        ErrorCode::TokenInvalid,
        ErrorCode::PrinterNotEnabled,
        ErrorCode::TeamNotFound,
        ErrorCode::InvalidTeamName,
        ErrorCode::ScriptInvalid,
        ErrorCode::JobNotFound,
        ErrorCode::QueueFull,
        ErrorCode::MalformedSubmission,
        ErrorCode::SubmissionTooLarge,
        ErrorCode::InvalidJobTransition,
        ErrorCode::AdmissionTimeout,
        ErrorCode::InternalError,
        ErrorCode::PrinterNotAvailable,
        ErrorCode::PrintFailed,
        ErrorCode::SystemBusy,
    ];

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::TokenInvalid.code(), 1004);
        assert_eq!(ErrorCode::PrinterNotEnabled.code(), 2101);
        assert_eq!(ErrorCode::TeamNotFound.code(), 3001);
        assert_eq!(ErrorCode::QueueFull.code(), 4002);
        assert_eq!(ErrorCode::PrintFailed.code(), 9202);
    }

    #[test]
    fn test_try_from_covers_every_code() {
        for code in ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_serialize_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::QueueFull).unwrap(), "4002");
        let code: ErrorCode = serde_json::from_str("3001").unwrap();
        assert_eq!(code, ErrorCode::TeamNotFound);
        assert!(serde_json::from_str::<ErrorCode>("77").is_err());
    }

    #[test]
    fn test_messages_are_not_empty() {
        for code in ALL {
            assert!(!code.message().is_empty(), "{code:?} has no message");
        }
    }
}
