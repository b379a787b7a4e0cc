//! Code page handling for thermal printers
//!
//! Text is transcoded to the printer's code page at the moment it is added
//! to a receipt. Command bytes never pass through the codec.
//!
//! Two code pages are supported:
//! - `Latin1`: Windows-1252 (ESC t 16), the default for Western printers
//! - `Gbk`: Chinese mode (FS &) for printers shipped with a GBK font

use serde::{Deserialize, Serialize};

const SELECT_WPC1252: [u8; 3] = [0x1B, 0x74, 16];
const CHINESE_ON: [u8; 2] = [0x1C, 0x26];
// FS & then FS C 1
const GBK_PREAMBLE: [u8; 5] = [0x1C, 0x26, 0x1C, 0x43, 0x01];
const CHINESE_OFF: [u8; 2] = [0x1C, 0x2E];

/// Printer code page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Latin1,
    Gbk,
}

impl TextEncoding {
    /// Parse a configuration value (`latin1`, `cp1252`, `gbk`, ...)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "cp1252" | "windows-1252" | "wpc1252" => Some(Self::Latin1),
            "gbk" | "gb2312" | "chinese" => Some(Self::Gbk),
            _ => None,
        }
    }

    fn codec(&self) -> &'static encoding_rs::Encoding {
        match self {
            TextEncoding::Latin1 => encoding_rs::WINDOWS_1252,
            TextEncoding::Gbk => encoding_rs::GBK,
        }
    }

    /// Mode selection written right after ESC @
    pub(crate) fn preamble(&self) -> &'static [u8] {
        match self {
            TextEncoding::Latin1 => &SELECT_WPC1252,
            TextEncoding::Gbk => &GBK_PREAMBLE,
        }
    }

    /// Bytes that close the receipt's text mode
    pub(crate) fn trailer(&self) -> &'static [u8] {
        match self {
            TextEncoding::Latin1 => &[],
            TextEncoding::Gbk => &CHINESE_OFF,
        }
    }

    /// Encode text into the code page, replacing unmappable characters with `?`
    ///
    /// Only text goes through here. Command bytes are appended by the
    /// builder as-is, so their arguments may use the full 0x00-0xFF range.
    pub fn encode_text(&self, text: &str, out: &mut Vec<u8>) {
        let codec = self.codec();
        match self {
            TextEncoding::Gbk => {
                // GBK has no euro sign; borrow it from PC858
                let mut parts = text.split('€').peekable();
                while let Some(part) = parts.next() {
                    push_encoded(codec, part, out);
                    if parts.peek().is_some() {
                        out.extend_from_slice(&CHINESE_OFF);
                        out.extend_from_slice(&[0x1B, 0x74, 19, 0xD5]);
                        out.extend_from_slice(&CHINESE_ON);
                    }
                }
            }
            TextEncoding::Latin1 => push_encoded(codec, text, out),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Latin1 => write!(f, "latin1"),
            TextEncoding::Gbk => write!(f, "gbk"),
        }
    }
}

fn push_encoded(codec: &'static encoding_rs::Encoding, text: &str, out: &mut Vec<u8>) {
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let (bytes, _, had_errors) = codec.encode(c.encode_utf8(&mut buf));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
}

/// Width of a single character in printer columns
fn char_width(c: char, encoding: TextEncoding) -> usize {
    match encoding {
        TextEncoding::Latin1 => 1,
        TextEncoding::Gbk => {
            let mut buf = [0u8; 4];
            let (bytes, _, had_errors) = encoding_rs::GBK.encode(c.encode_utf8(&mut buf));
            if had_errors { 1 } else { bytes.len() }
        }
    }
}

/// Printed width of a string in columns
///
/// Double-byte GBK characters occupy two columns.
pub fn text_width(s: &str, encoding: TextEncoding) -> usize {
    s.chars().map(|c| char_width(c, encoding)).sum()
}

/// Truncate a string to fit within `max_width` columns
pub fn truncate_to_width(s: &str, max_width: usize, encoding: TextEncoding) -> String {
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = char_width(c, encoding);
        if width + w > max_width {
            break;
        }
        result.push(c);
        width += w;
    }
    result
}

/// Pad a string with spaces to exactly `width` columns
///
/// Longer strings are truncated.
pub fn pad_to_width(s: &str, width: usize, align_right: bool, encoding: TextEncoding) -> String {
    let current = text_width(s, encoding);
    if current >= width {
        return truncate_to_width(s, width, encoding);
    }
    let spaces = " ".repeat(width - current);
    if align_right {
        format!("{spaces}{s}")
    } else {
        format!("{s}{spaces}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("hello", TextEncoding::Latin1), 5);
        assert_eq!(text_width("café", TextEncoding::Latin1), 4);
        assert_eq!(text_width("你好", TextEncoding::Gbk), 4);
        assert_eq!(text_width("AB中文CD", TextEncoding::Gbk), 8);
    }

    #[test]
    fn test_truncate_and_pad() {
        assert_eq!(truncate_to_width("hello world", 5, TextEncoding::Latin1), "hello");
        assert_eq!(truncate_to_width("AB中文", 4, TextEncoding::Gbk), "AB中");
        assert_eq!(pad_to_width("hi", 5, false, TextEncoding::Latin1), "hi   ");
        assert_eq!(pad_to_width("hi", 5, true, TextEncoding::Latin1), "   hi");
    }

    #[test]
    fn test_latin1_text_encoding() {
        let mut out = Vec::new();
        TextEncoding::Latin1.encode_text("Café €5", &mut out);
        assert_eq!(out, [b'C', b'a', b'f', 0xE9, b' ', 0x80, b'5']);
    }

    #[test]
    fn test_unmappable_becomes_question_mark() {
        let mut out = Vec::new();
        TextEncoding::Latin1.encode_text("a中b", &mut out);
        assert_eq!(out, b"a?b");
    }

    #[test]
    fn test_gbk_text_and_euro_fallback() {
        let mut out = Vec::new();
        TextEncoding::Gbk.encode_text("中€", &mut out);
        assert_eq!(
            out,
            [0xD6, 0xD0, 0x1C, 0x2E, 0x1B, 0x74, 19, 0xD5, 0x1C, 0x26]
        );
    }

    #[test]
    fn test_preamble_and_trailer() {
        assert_eq!(TextEncoding::Latin1.preamble(), &[0x1B, 0x74, 16]);
        assert!(TextEncoding::Latin1.trailer().is_empty());
        assert_eq!(
            TextEncoding::Gbk.preamble(),
            &[0x1C, 0x26, 0x1C, 0x43, 0x01]
        );
        assert_eq!(TextEncoding::Gbk.trailer(), &[0x1C, 0x2E]);
    }
}
