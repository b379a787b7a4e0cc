//! Side-effect-free printer backend
//!
//! Renders receipts as plain text. Lines accumulate until `cut`, which
//! flushes them as one block to the [`ReceiptLog`] and to the log output.

use crate::capability::{BackendKind, PrinterCapability};
use crate::encoding::{TextEncoding, text_width};
use crate::error::PrintResult;
use crate::types::{
    Alignment, BarcodeOptions, BarcodeType, ImageOptions, QrCodeOptions, TextStyle,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Receipts rendered by a [`MockPrinter`], oldest first
///
/// Cloning shares the same log.
#[derive(Debug, Clone, Default)]
pub struct ReceiptLog {
    inner: Arc<Mutex<Vec<String>>>,
}

impl ReceiptLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, receipt: String) {
        self.inner.lock().push(receipt);
    }

    pub fn all(&self) -> Vec<String> {
        self.inner.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.inner.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

/// Mock receipt printer
pub struct MockPrinter {
    width: usize,
    lines: Vec<String>,
    alignment: Alignment,
    style: TextStyle,
    log: ReceiptLog,
}

impl MockPrinter {
    pub fn new(width: usize) -> Self {
        Self::with_log(width, ReceiptLog::new())
    }

    /// Create a mock that appends to an existing receipt log
    pub fn with_log(width: usize, log: ReceiptLog) -> Self {
        Self {
            width,
            lines: Vec::new(),
            alignment: Alignment::Left,
            style: TextStyle::default(),
            log,
        }
    }

    pub fn log(&self) -> ReceiptLog {
        self.log.clone()
    }

    /// Lines buffered since the last cut
    pub fn pending_lines(&self) -> &[String] {
        &self.lines
    }

    fn push_aligned(&mut self, content: String) {
        let used = text_width(&content, TextEncoding::Latin1);
        let gap = self.width.saturating_sub(used);
        let indent = match self.alignment {
            Alignment::Left => 0,
            Alignment::Center => gap / 2,
            Alignment::Right => gap,
        };
        self.lines.push(format!("{}{}", " ".repeat(indent), content));
    }
}

#[async_trait]
impl PrinterCapability for MockPrinter {
    fn add_text(&mut self, text: &str, style: Option<TextStyle>) -> PrintResult<()> {
        let style = style.unwrap_or(self.style);
        let body = text.strip_suffix('\n').unwrap_or(text);
        for line in body.split('\n') {
            let rendered = if style.bold && !line.is_empty() {
                format!("**{line}**")
            } else {
                line.to_string()
            };
            self.push_aligned(rendered);
        }
        Ok(())
    }

    fn set_style(&mut self, style: TextStyle) -> PrintResult<()> {
        debug!(?style, "Set text style");
        self.style = style;
        Ok(())
    }

    fn set_align(&mut self, alignment: Alignment) -> PrintResult<()> {
        debug!(%alignment, "Set alignment");
        self.alignment = alignment;
        Ok(())
    }

    fn add_barcode(
        &mut self,
        data: &str,
        kind: BarcodeType,
        _options: BarcodeOptions,
    ) -> PrintResult<()> {
        self.push_aligned(format!("[BARCODE {kind}: {data}]"));
        Ok(())
    }

    fn add_qr_code(&mut self, data: &str, _options: QrCodeOptions) -> PrintResult<()> {
        self.push_aligned(format!("[QR: {data}]"));
        Ok(())
    }

    fn add_image(&mut self, data: &str, _options: ImageOptions) -> PrintResult<()> {
        let preview: String = data.chars().take(20).collect();
        self.push_aligned(format!("[IMAGE: {preview}...]"));
        Ok(())
    }

    fn feed_lines(&mut self, lines: u8) -> PrintResult<()> {
        self.lines
            .extend(std::iter::repeat_n(String::new(), lines as usize));
        Ok(())
    }

    async fn cut(&mut self) -> PrintResult<()> {
        let receipt = std::mem::take(&mut self.lines).join("\n");
        info!(
            target: "receipt",
            lines = receipt.lines().count(),
            "Mock receipt printed\n{}\n{}",
            receipt,
            "-".repeat(self.width)
        );
        self.log.push(receipt);
        self.alignment = Alignment::Left;
        self.style = TextStyle::default();
        Ok(())
    }

    fn discard(&mut self) {
        if !self.lines.is_empty() {
            debug!(lines = self.lines.len(), "Discarding unfinished receipt");
        }
        self.lines.clear();
        self.alignment = Alignment::Left;
        self.style = TextStyle::default();
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }
}
