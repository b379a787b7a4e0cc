//! Option types shared by every printer backend
//!
//! Names and defaults follow the Epson ePOS surface that team scripts are
//! written against. All enums serialize in SCREAMING_SNAKE_CASE and parse
//! case-insensitively, so `"center"`, `"CENTER"` and `"Center"` are the same.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize an enum name for lenient matching: uppercase, no `_`/`-`/space
fn fold(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn parse(name: &str) -> Option<Self> {
        match fold(name).as_str() {
            "LEFT" | "L" => Some(Self::Left),
            "CENTER" | "CENTRE" | "C" | "MIDDLE" => Some(Self::Center),
            "RIGHT" | "R" => Some(Self::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Left => write!(f, "LEFT"),
            Alignment::Center => write!(f, "CENTER"),
            Alignment::Right => write!(f, "RIGHT"),
        }
    }
}

/// Character size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextSize {
    Small,
    #[default]
    Normal,
    Large,
    #[serde(rename = "XLARGE")]
    XLarge,
}

impl TextSize {
    pub fn parse(name: &str) -> Option<Self> {
        match fold(name).as_str() {
            "SMALL" | "S" => Some(Self::Small),
            "NORMAL" | "MEDIUM" | "M" | "1" => Some(Self::Normal),
            "LARGE" | "L" | "DOUBLE" | "2" => Some(Self::Large),
            "XLARGE" | "XL" | "EXTRALARGE" | "3" => Some(Self::XLarge),
            _ => None,
        }
    }

    /// Width/height magnification factor
    pub fn magnification(&self) -> u8 {
        match self {
            TextSize::Small | TextSize::Normal => 1,
            TextSize::Large => 2,
            TextSize::XLarge => 3,
        }
    }
}

/// Text styling options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub bold: bool,
    pub underline: bool,
    pub size: TextSize,
}

impl TextStyle {
    /// Bold, normal size
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: TextSize) -> Self {
        self.size = size;
        self
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// Barcode symbologies supported by ESC/POS `GS k`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BarcodeType {
    #[serde(rename = "UPC_A")]
    UpcA,
    #[serde(rename = "UPC_E")]
    UpcE,
    #[serde(rename = "EAN13")]
    Ean13,
    #[serde(rename = "EAN8")]
    Ean8,
    #[serde(rename = "CODE39")]
    Code39,
    #[serde(rename = "ITF")]
    Itf,
    #[serde(rename = "CODABAR")]
    Codabar,
    #[serde(rename = "CODE93")]
    Code93,
    #[default]
    #[serde(rename = "CODE128")]
    Code128,
    #[serde(rename = "GS1_128")]
    Gs1_128,
}

impl BarcodeType {
    pub fn parse(name: &str) -> Option<Self> {
        match fold(name).as_str() {
            "UPCA" => Some(Self::UpcA),
            "UPCE" => Some(Self::UpcE),
            "EAN13" | "JAN13" => Some(Self::Ean13),
            "EAN8" | "JAN8" => Some(Self::Ean8),
            "CODE39" => Some(Self::Code39),
            "ITF" => Some(Self::Itf),
            "CODABAR" | "NW7" => Some(Self::Codabar),
            "CODE93" => Some(Self::Code93),
            "CODE128" => Some(Self::Code128),
            "GS1128" => Some(Self::Gs1_128),
            _ => None,
        }
    }

    /// `m` parameter of `GS k` (function B form)
    pub(crate) fn escpos_code(&self) -> u8 {
        match self {
            BarcodeType::UpcA => 65,
            BarcodeType::UpcE => 66,
            BarcodeType::Ean13 => 67,
            BarcodeType::Ean8 => 68,
            BarcodeType::Code39 => 69,
            BarcodeType::Itf => 70,
            BarcodeType::Codabar => 71,
            BarcodeType::Code93 => 72,
            BarcodeType::Code128 => 73,
            BarcodeType::Gs1_128 => 74,
        }
    }
}

impl fmt::Display for BarcodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BarcodeType::UpcA => "UPC_A",
            BarcodeType::UpcE => "UPC_E",
            BarcodeType::Ean13 => "EAN13",
            BarcodeType::Ean8 => "EAN8",
            BarcodeType::Code39 => "CODE39",
            BarcodeType::Itf => "ITF",
            BarcodeType::Codabar => "CODABAR",
            BarcodeType::Code93 => "CODE93",
            BarcodeType::Code128 => "CODE128",
            BarcodeType::Gs1_128 => "GS1_128",
        };
        f.write_str(name)
    }
}

/// Barcode printing options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeOptions {
    /// Module width in dots (2-6)
    pub width: u8,
    /// Bar height in dots
    pub height: u8,
    /// Print the human readable interpretation below the bars
    pub hri: bool,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            width: 2,
            height: 100,
            hri: true,
        }
    }
}

/// QR code error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QrErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl QrErrorCorrection {
    pub fn parse(name: &str) -> Option<Self> {
        match fold(name).as_str() {
            "L" | "LOW" => Some(Self::L),
            "M" | "MEDIUM" => Some(Self::M),
            "Q" | "QUARTILE" => Some(Self::Q),
            "H" | "HIGH" => Some(Self::H),
            _ => None,
        }
    }

    /// `n` parameter of function 169
    pub(crate) fn escpos_code(&self) -> u8 {
        match self {
            QrErrorCorrection::L => 0x30,
            QrErrorCorrection::M => 0x31,
            QrErrorCorrection::Q => 0x32,
            QrErrorCorrection::H => 0x33,
        }
    }
}

/// QR code printing options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QrCodeOptions {
    /// Module size in dots (1-16)
    pub size: u8,
    pub error_correction: QrErrorCorrection,
}

impl Default for QrCodeOptions {
    fn default() -> Self {
        Self {
            size: 3,
            error_correction: QrErrorCorrection::M,
        }
    }
}

/// Image printing options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Target width in dots; wider images are scaled down
    pub width: u32,
    pub alignment: Alignment,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width: 384,
            alignment: Alignment::Center,
        }
    }
}
