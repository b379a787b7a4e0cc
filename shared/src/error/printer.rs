//! Printer failures as application errors

use super::codes::ErrorCode;
use super::types::AppError;
use receipt_printer::{BackendInitError, PrintError, SessionState};

impl From<PrintError> for AppError {
    /// Unreachable devices become [`ErrorCode::PrinterNotAvailable`]; anything
    /// that went wrong after the device answered is [`ErrorCode::PrintFailed`]
    fn from(err: PrintError) -> Self {
        let code = match &err {
            PrintError::Connection(_)
            | PrintError::AlreadyConnected
            | PrintError::NotConnected
            | PrintError::Timeout(_)
            | PrintError::InvalidConfig(_)
            | PrintError::Session {
                phase: SessionState::Connecting,
                ..
            } => ErrorCode::PrinterNotAvailable,
            PrintError::Io(_) | PrintError::Session { .. } | PrintError::InvalidData(_) => {
                ErrorCode::PrintFailed
            }
        };
        AppError::with_message(code, err.to_string())
    }
}

impl From<&BackendInitError> for AppError {
    fn from(err: &BackendInitError) -> Self {
        AppError::with_message(ErrorCode::PrinterNotAvailable, err.message.clone())
            .with_detail("kind", format!("{:?}", err.kind))
            .with_detail("steps", err.details.clone())
    }
}
