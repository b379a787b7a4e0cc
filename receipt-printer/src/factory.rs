//! Backend selection
//!
//! [`create_backend`] always returns a usable printer. When the hardware
//! cannot be used it falls back to the mock and explains why, with steps the
//! operator can take.

use crate::capability::{SharedPrinter, shared};
use crate::hardware::{HardwarePrinter, SessionConfig};
use crate::mock::{MockPrinter, ReceiptLog};
use crate::transport::{PrinterAddress, PrinterTransport, TcpTransport};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Why the hardware backend is not in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendInitErrorKind {
    NotConfigured,
    InvalidAddress,
    InitializationFailed,
}

/// Structured diagnostic for a hardware fallback
#[derive(Debug, Clone, Serialize)]
pub struct BackendInitError {
    pub kind: BackendInitErrorKind,
    pub message: String,
    /// Remediation steps
    pub details: Vec<String>,
}

impl fmt::Display for BackendInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BackendInitError {}

/// Result of backend selection
pub struct BackendInit {
    pub printer: SharedPrinter,
    pub is_real: bool,
    pub error: Option<BackendInitError>,
}

impl BackendInit {
    fn fallback(config: &SessionConfig, log: ReceiptLog, error: BackendInitError) -> Self {
        warn!(kind = ?error.kind, message = %error.message, "Using mock printer");
        Self {
            printer: shared(MockPrinter::with_log(config.paper_width, log)),
            is_real: false,
            error: Some(error),
        }
    }
}

/// Pick the printer backend for `address`
///
/// `None` selects the mock. Otherwise the address is parsed and probed; a
/// reachable printer yields a [`HardwarePrinter`] over TCP.
pub async fn create_backend(
    address: Option<&str>,
    config: SessionConfig,
    log: ReceiptLog,
) -> BackendInit {
    let Some(raw) = address.map(str::trim).filter(|a| !a.is_empty()) else {
        return BackendInit::fallback(
            &config,
            log,
            BackendInitError {
                kind: BackendInitErrorKind::NotConfigured,
                message: "No printer address configured".into(),
                details: vec![
                    "Set PRINTER_ADDRESS=TCP:<ip>[:port] to print on a network printer".into(),
                    "Receipts are written to the log until a printer is configured".into(),
                ],
            },
        );
    };

    let address = match PrinterAddress::parse(raw) {
        Ok(address) => address,
        Err(e) => {
            return BackendInit::fallback(
                &config,
                log,
                BackendInitError {
                    kind: BackendInitErrorKind::InvalidAddress,
                    message: e.to_string(),
                    details: vec![
                        "Use the form TCP:192.168.1.50 or TCP:192.168.1.50:9100".into(),
                        "USB and Bluetooth printers are not supported".into(),
                    ],
                },
            );
        }
    };

    let transport = TcpTransport::new(address.clone());
    if !transport.is_online().await {
        return BackendInit::fallback(
            &config,
            log,
            BackendInitError {
                kind: BackendInitErrorKind::InitializationFailed,
                message: format!("Printer at {address} is not reachable"),
                details: vec![
                    "Check that the printer is powered on and connected to the network".into(),
                    format!("Verify that {}:{} is reachable from this machine", address.host, address.port),
                    "Network receipt printers usually accept raw jobs on port 9100".into(),
                ],
            },
        );
    }

    info!(printer = %address, "Using hardware printer");
    BackendInit {
        printer: shared(HardwarePrinter::new(transport, config)),
        is_real: true,
        error: None,
    }
}
