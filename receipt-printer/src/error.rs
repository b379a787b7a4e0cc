//! Error types for the printer library

use crate::hardware::SessionState;
use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The transport reports an open session on the device.
    ///
    /// This is the one connect error the hardware backend recovers from.
    #[error("Device already connected")]
    AlreadyConnected,

    /// The transport has no open session (disconnect treats this as success)
    #[error("Device not connected")]
    NotConnected,

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A session step failed after the device was reached
    #[error("{phase} failed: {message}")]
    Session {
        phase: SessionState,
        message: String,
    },

    /// Command payload could not be rendered (bad base64, undecodable image, ...)
    #[error("Invalid command data: {0}")]
    InvalidData(String),
}

impl PrintError {
    /// Wrap an error with the session phase it happened in
    pub(crate) fn in_phase(phase: SessionState, err: PrintError) -> Self {
        match err {
            PrintError::Session { .. } => err,
            other => PrintError::Session {
                phase,
                message: other.to_string(),
            },
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
