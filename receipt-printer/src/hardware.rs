//! Hardware printer backend
//!
//! Capability calls render into an ESC/POS buffer. `cut` then runs one device
//! session over the transport:
//!
//! ```text
//! Idle -> Connecting -> Transacting -> Sending -> Disconnecting -> Idle
//! ```
//!
//! - connect is bounded by `connect_timeout`; an "already connected" answer
//!   gets exactly one recovery pass (disconnect, pause, reconnect)
//! - begin / send / end run in order and the first failure aborts the job
//! - disconnect always runs after `settle_delay`; "not connected" counts as
//!   success and any other disconnect error is only logged

use crate::capability::{BackendKind, PrinterCapability};
use crate::encoding::TextEncoding;
use crate::error::{PrintError, PrintResult};
use crate::escpos::EscPosBuilder;
use crate::transport::PrinterTransport;
use crate::types::{
    Alignment, BarcodeOptions, BarcodeType, ImageOptions, QrCodeOptions, TextStyle,
};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Phase of a device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Connecting,
    Transacting,
    Sending,
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::Connecting => "Connecting",
            SessionState::Transacting => "Transacting",
            SessionState::Sending => "Sending",
            SessionState::Disconnecting => "Disconnecting",
        };
        f.write_str(name)
    }
}

/// Timing and rendering parameters of the hardware backend
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub connect_timeout: Duration,
    /// Delay before disconnect so the device can drain its buffer
    pub settle_delay: Duration,
    /// Pause between the forced disconnect and the reconnect
    pub retry_pause: Duration,
    pub paper_width: usize,
    pub encoding: TextEncoding,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_millis(500),
            retry_pause: Duration::from_millis(100),
            paper_width: 48,
            encoding: TextEncoding::Latin1,
        }
    }
}

/// ESC/POS printer behind a [`PrinterTransport`]
pub struct HardwarePrinter<T: PrinterTransport> {
    transport: T,
    config: SessionConfig,
    builder: EscPosBuilder,
    style: TextStyle,
    alignment: Alignment,
    state: SessionState,
}

impl<T: PrinterTransport> HardwarePrinter<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            builder: EscPosBuilder::with_encoding(config.paper_width, config.encoding),
            transport,
            config,
            style: TextStyle::default(),
            alignment: Alignment::Left,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn connect_once(&mut self) -> PrintResult<()> {
        let timeout = self.config.connect_timeout;
        tokio::time::timeout(timeout, self.transport.connect())
            .await
            .map_err(|_| {
                PrintError::Timeout(format!(
                    "no answer from {} within {:?}",
                    self.transport.describe(),
                    timeout
                ))
            })?
    }

    async fn connect(&mut self) -> PrintResult<()> {
        match self.connect_once().await {
            Err(PrintError::AlreadyConnected) => {
                warn!(
                    printer = %self.transport.describe(),
                    "Printer reports an open session, forcing disconnect and retrying"
                );
                if let Err(e) = self.transport.disconnect().await {
                    debug!(error = %e, "Forced disconnect failed");
                }
                tokio::time::sleep(self.config.retry_pause).await;
                self.connect_once().await
            }
            other => other,
        }
    }

    async fn transmit(&mut self, data: &[u8]) -> PrintResult<()> {
        self.state = SessionState::Connecting;
        self.connect()
            .await
            .map_err(|e| PrintError::in_phase(SessionState::Connecting, e))?;

        self.state = SessionState::Transacting;
        self.transport
            .begin_transaction()
            .await
            .map_err(|e| PrintError::in_phase(SessionState::Transacting, e))?;

        self.state = SessionState::Sending;
        self.transport
            .send_data(data)
            .await
            .map_err(|e| PrintError::in_phase(SessionState::Sending, e))?;

        self.state = SessionState::Transacting;
        self.transport
            .end_transaction()
            .await
            .map_err(|e| PrintError::in_phase(SessionState::Transacting, e))
    }

    async fn disconnect(&mut self) {
        self.state = SessionState::Disconnecting;
        tokio::time::sleep(self.config.settle_delay).await;
        match self.transport.disconnect().await {
            Ok(()) | Err(PrintError::NotConnected) => {}
            Err(e) => warn!(
                printer = %self.transport.describe(),
                error = %e,
                "Disconnect failed"
            ),
        }
        self.state = SessionState::Idle;
    }

    /// Run one full device session for `data`
    #[instrument(skip(self, data), fields(printer = %self.transport.describe(), bytes = data.len()))]
    async fn run_session(&mut self, data: &[u8]) -> PrintResult<()> {
        let outcome = self.transmit(data).await;
        self.disconnect().await;
        match &outcome {
            Ok(()) => info!("Receipt sent"),
            Err(e) => warn!(error = %e, "Print session failed"),
        }
        outcome
    }
}

#[async_trait]
impl<T: PrinterTransport> PrinterCapability for HardwarePrinter<T> {
    fn add_text(&mut self, text: &str, style: Option<TextStyle>) -> PrintResult<()> {
        if let Some(style) = style {
            self.builder.style(style);
        }
        if text.ends_with('\n') {
            self.builder.text(text);
        } else {
            self.builder.line(text);
        }
        if style.is_some() {
            self.builder.style(self.style);
        }
        Ok(())
    }

    fn set_style(&mut self, style: TextStyle) -> PrintResult<()> {
        self.style = style;
        self.builder.style(style);
        Ok(())
    }

    fn set_align(&mut self, alignment: Alignment) -> PrintResult<()> {
        self.alignment = alignment;
        self.builder.align(alignment);
        Ok(())
    }

    fn add_barcode(
        &mut self,
        data: &str,
        kind: BarcodeType,
        options: BarcodeOptions,
    ) -> PrintResult<()> {
        if data.is_empty() {
            return Err(PrintError::InvalidData("empty barcode data".into()));
        }
        self.builder.barcode(data, kind, options)?;
        Ok(())
    }

    fn add_qr_code(&mut self, data: &str, options: QrCodeOptions) -> PrintResult<()> {
        if data.is_empty() {
            return Err(PrintError::InvalidData("empty QR code data".into()));
        }
        self.builder.qr_code(data, options)?;
        Ok(())
    }

    #[cfg(feature = "image")]
    fn add_image(&mut self, data: &str, options: ImageOptions) -> PrintResult<()> {
        use base64::Engine;

        let payload = data
            .split_once("base64,")
            .map_or(data, |(_, rest)| rest)
            .trim();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| PrintError::InvalidData(format!("invalid base64 image: {e}")))?;
        let raster = crate::escpos::rasterize_image(&bytes, options.width)?;

        self.builder.align(options.alignment);
        self.builder.raw(&raster);
        self.builder.align(self.alignment);
        Ok(())
    }

    #[cfg(not(feature = "image"))]
    fn add_image(&mut self, _data: &str, _options: ImageOptions) -> PrintResult<()> {
        Err(PrintError::InvalidData(
            "image printing is not compiled in".into(),
        ))
    }

    fn feed_lines(&mut self, lines: u8) -> PrintResult<()> {
        self.builder.feed(lines);
        Ok(())
    }

    async fn cut(&mut self) -> PrintResult<()> {
        self.builder.cut();
        let data = self.builder.take().build();
        self.style = TextStyle::default();
        self.alignment = Alignment::Left;
        self.run_session(&data).await
    }

    fn discard(&mut self) {
        let dropped = self.builder.take();
        if !dropped.is_empty() {
            debug!("Discarding unfinished receipt");
        }
        self.style = TextStyle::default();
        self.alignment = Alignment::Left;
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Hardware
    }
}
