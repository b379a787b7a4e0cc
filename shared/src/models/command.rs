//! Canonical printer commands
//!
//! Backend-agnostic instructions produced by the submission normalizer and
//! the script interpreter. The serialized form is the canonical wire shape:
//!
//! ```json
//! {"commands": [
//!   {"type": "SET_ALIGN", "alignment": "CENTER"},
//!   {"type": "TEXT", "content": "Hello", "style": {"bold": true}},
//!   {"type": "FEED_LINES", "lines": 2},
//!   {"type": "CUT"}
//! ]}
//! ```

use receipt_printer::{
    Alignment, BarcodeOptions, BarcodeType, ImageOptions, QrCodeOptions, QrErrorCorrection,
    TextSize, TextStyle,
};
use serde::{Deserialize, Serialize};

fn default_qr_size() -> u8 {
    QrCodeOptions::default().size
}

/// One printer instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum PrinterCommand {
    Text {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<TextStyle>,
    },
    SetStyle {
        #[serde(default)]
        bold: bool,
        #[serde(default)]
        underline: bool,
        #[serde(default)]
        size: TextSize,
    },
    SetAlign {
        alignment: Alignment,
    },
    Barcode {
        data: String,
        #[serde(default)]
        symbology: BarcodeType,
        #[serde(default)]
        options: BarcodeOptions,
    },
    QrCode {
        data: String,
        #[serde(default = "default_qr_size")]
        size: u8,
        #[serde(default)]
        error_correction: QrErrorCorrection,
    },
    Image {
        data: String,
        #[serde(default)]
        options: ImageOptions,
    },
    FeedLines {
        lines: u8,
    },
    Cut,
    /// A command type nobody recognized; kept for diagnostics, skipped on print
    Unknown {
        raw_type: String,
    },
}

impl PrinterCommand {
    /// Plain text line
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            style: None,
        }
    }

    /// Text line with an explicit style
    pub fn styled(content: impl Into<String>, style: TextStyle) -> Self {
        Self::Text {
            content: content.into(),
            style: Some(style),
        }
    }

    pub fn set_style(style: TextStyle) -> Self {
        Self::SetStyle {
            bold: style.bold,
            underline: style.underline,
            size: style.size,
        }
    }

    /// Canonical type tag, as used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "TEXT",
            Self::SetStyle { .. } => "SET_STYLE",
            Self::SetAlign { .. } => "SET_ALIGN",
            Self::Barcode { .. } => "BARCODE",
            Self::QrCode { .. } => "QR_CODE",
            Self::Image { .. } => "IMAGE",
            Self::FeedLines { .. } => "FEED_LINES",
            Self::Cut => "CUT",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }

    pub fn is_cut(&self) -> bool {
        matches!(self, Self::Cut)
    }
}
