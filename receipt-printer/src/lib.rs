//! # receipt-printer
//!
//! Receipt printer library - the instruction surface every backend speaks,
//! plus the backends themselves.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - The [`PrinterCapability`] trait (text, style, alignment, barcode, QR,
//!   image, feed, cut)
//! - ESC/POS command building and code page encoding
//! - A side-effect-free [`MockPrinter`] that renders receipts as text
//! - A [`HardwarePrinter`] that drives a device through the
//!   connect / transact / send / disconnect session protocol
//! - Backend selection with structured diagnostics ([`create_backend`])
//!
//! Business logic (WHAT to print, whose job runs next) stays in the server.
//!
//! ## Example
//!
//! ```ignore
//! use receipt_printer::{Alignment, MockPrinter, PrinterCapability, TextStyle};
//!
//! let mut printer = MockPrinter::new(32);
//! printer.set_align(Alignment::Center)?;
//! printer.add_text("TEAM ROCKET", Some(TextStyle::bold()))?;
//! printer.feed_lines(2)?;
//! printer.cut().await?;
//! ```

mod capability;
mod encoding;
mod error;
mod escpos;
mod factory;
mod hardware;
mod mock;
mod transport;
mod types;

// Re-exports
pub use capability::{BackendKind, PrinterCapability, SharedPrinter, shared};
pub use encoding::{TextEncoding, pad_to_width, text_width, truncate_to_width};
pub use error::{PrintError, PrintResult};
pub use escpos::{BARCODE_MAX_BYTES, EscPosBuilder, QR_MAX_BYTES};
pub use factory::{BackendInit, BackendInitError, BackendInitErrorKind, create_backend};
pub use hardware::{HardwarePrinter, SessionConfig, SessionState};
pub use mock::{MockPrinter, ReceiptLog};
pub use transport::{PrinterAddress, PrinterTransport, TcpTransport};
pub use types::{
    Alignment, BarcodeOptions, BarcodeType, ImageOptions, QrCodeOptions, QrErrorCorrection,
    TextSize, TextStyle,
};

#[cfg(feature = "image")]
pub use escpos::rasterize_image;
