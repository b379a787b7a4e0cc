//! The printer capability surface
//!
//! Every backend (mock or hardware) implements [`PrinterCapability`]. Calls
//! other than [`PrinterCapability::cut`] only buffer output; `cut` finishes
//! the receipt, which for a hardware backend runs a whole device session.
//! [`PrinterCapability::discard`] throws a half-built receipt away.

use crate::error::PrintResult;
use crate::types::{
    Alignment, BarcodeOptions, BarcodeType, ImageOptions, QrCodeOptions, TextStyle,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Which kind of backend sits behind a capability object
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Mock,
    Hardware,
}

/// Abstract receipt printer
///
/// Text is line oriented: `add_text` ends the line unless the text already
/// ends with a newline.
#[async_trait]
pub trait PrinterCapability: Send {
    /// Print a line of text, optionally overriding the current style for it
    fn add_text(&mut self, text: &str, style: Option<TextStyle>) -> PrintResult<()>;

    /// Set the style used by subsequent text
    fn set_style(&mut self, style: TextStyle) -> PrintResult<()>;

    fn set_align(&mut self, alignment: Alignment) -> PrintResult<()>;

    fn add_barcode(
        &mut self,
        data: &str,
        kind: BarcodeType,
        options: BarcodeOptions,
    ) -> PrintResult<()>;

    fn add_qr_code(&mut self, data: &str, options: QrCodeOptions) -> PrintResult<()>;

    /// Print a base64 encoded image
    fn add_image(&mut self, data: &str, options: ImageOptions) -> PrintResult<()>;

    fn feed_lines(&mut self, lines: u8) -> PrintResult<()>;

    /// Cut the paper and emit the buffered receipt
    async fn cut(&mut self) -> PrintResult<()>;

    /// Drop everything buffered since the last cut and restore the default
    /// style and alignment. Nothing reaches the device or the receipt log.
    fn discard(&mut self);

    fn kind(&self) -> BackendKind;
}

/// A backend behind its single-writer lock
///
/// Whoever holds the guard owns the device for the whole job, so commands
/// from two jobs never interleave.
pub type SharedPrinter = Arc<Mutex<Box<dyn PrinterCapability>>>;

/// Wrap a backend in its single-writer lock
pub fn shared<P: PrinterCapability + 'static>(printer: P) -> SharedPrinter {
    Arc::new(Mutex::new(Box::new(printer)))
}
