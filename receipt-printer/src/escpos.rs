//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use crate::encoding::TextEncoding;
use crate::error::{PrintError, PrintResult};
use crate::types::{Alignment, BarcodeOptions, BarcodeType, QrCodeOptions, TextSize, TextStyle};

/// Longest payload GS k accepts (one length byte)
pub const BARCODE_MAX_BYTES: usize = 255;

/// QR model 2 capacity at version 40, numeric mode
pub const QR_MAX_BYTES: usize = 7089;

/// ESC/POS command builder
///
/// Text is encoded into the builder's code page as it is added; command
/// bytes are appended verbatim.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
    encoding: TextEncoding,
    header_len: usize,
}

impl EscPosBuilder {
    /// Create a new Latin-1 builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        Self::with_encoding(width, TextEncoding::default())
    }

    /// Create a builder that encodes text for the given code page
    pub fn with_encoding(width: usize, encoding: TextEncoding) -> Self {
        let mut buf = Vec::with_capacity(4096);
        // ESC @ resets the code page, so select ours right after
        buf.extend_from_slice(&[0x1B, 0x40]);
        buf.extend_from_slice(encoding.preamble());
        let header_len = buf.len();
        Self {
            buf,
            width,
            encoding,
            header_len,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// True when nothing has been added since the initial reset
    pub fn is_empty(&self) -> bool {
        self.buf.len() <= self.header_len
    }

    // === Text Output ===

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.encoding.encode_text(s, &mut self.buf);
        self
    }

    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines (ESC d n)
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment and Style ===

    pub fn align(&mut self, alignment: Alignment) -> &mut Self {
        let n = match alignment {
            Alignment::Left => 0x00,
            Alignment::Center => 0x01,
            Alignment::Right => 0x02,
        };
        self.buf.extend_from_slice(&[0x1B, 0x61, n]);
        self
    }

    /// Apply a complete text style (bold, underline, font and magnification)
    pub fn style(&mut self, style: TextStyle) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, style.bold as u8]);
        self.buf.extend_from_slice(&[0x1B, 0x2D, style.underline as u8]);
        // Small text uses font B
        let font = u8::from(style.size == TextSize::Small);
        self.buf.extend_from_slice(&[0x1B, 0x4D, font]);
        let m = style.size.magnification() - 1;
        self.buf.extend_from_slice(&[0x1D, 0x21, (m << 4) | m]);
        self
    }

    pub fn reset_style(&mut self) -> &mut Self {
        self.style(TextStyle::default())
    }

    // === Barcode ===

    /// Print a barcode (GS k, function B form)
    ///
    /// Fails with [`PrintError::InvalidData`] when the payload does not fit
    /// the one-byte length field. Nothing is written in that case.
    pub fn barcode(
        &mut self,
        data: &str,
        kind: BarcodeType,
        options: BarcodeOptions,
    ) -> PrintResult<&mut Self> {
        let mut payload = Vec::with_capacity(data.len() + 2);
        // CODE128 needs a code set selector; default to set B
        if matches!(kind, BarcodeType::Code128 | BarcodeType::Gs1_128) && !data.starts_with('{') {
            payload.extend_from_slice(b"{B");
        }
        payload.extend_from_slice(data.as_bytes());
        if payload.len() > BARCODE_MAX_BYTES {
            return Err(PrintError::InvalidData(format!(
                "barcode data is {} bytes, limit is {}",
                payload.len(),
                BARCODE_MAX_BYTES
            )));
        }

        let hri = if options.hri { 0x02 } else { 0x00 };
        // GS H - HRI position
        self.buf.extend_from_slice(&[0x1D, 0x48, hri]);
        // GS h - height
        self.buf.extend_from_slice(&[0x1D, 0x68, options.height.max(1)]);
        // GS w - module width
        self.buf
            .extend_from_slice(&[0x1D, 0x77, options.width.clamp(2, 6)]);

        self.buf
            .extend_from_slice(&[0x1D, 0x6B, kind.escpos_code(), payload.len() as u8]);
        self.buf.extend_from_slice(&payload);
        self.buf.push(b'\n');
        Ok(self)
    }

    // === QR Code ===

    /// Print a QR code (GS ( k, model 2)
    ///
    /// Payloads over [`QR_MAX_BYTES`] are rejected rather than cut short.
    pub fn qr_code(&mut self, data: &str, options: QrCodeOptions) -> PrintResult<&mut Self> {
        let data_bytes = data.as_bytes();
        if data_bytes.len() > QR_MAX_BYTES {
            return Err(PrintError::InvalidData(format!(
                "QR code data is {} bytes, limit is {}",
                data_bytes.len(),
                QR_MAX_BYTES
            )));
        }
        let size = options.size.clamp(1, 16);

        // Function 165: Select model (Model 2)
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);

        // Function 167: Set module size
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, size]);

        // Function 169: Set error correction
        self.buf.extend_from_slice(&[
            0x1D,
            0x28,
            0x6B,
            0x03,
            0x00,
            0x31,
            0x45,
            options.error_correction.escpos_code(),
        ]);

        // Function 180: Store data
        let len = data_bytes.len() + 3;
        let p_l = (len & 0xFF) as u8;
        let p_h = ((len >> 8) & 0xFF) as u8;
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, p_l, p_h, 0x31, 0x50, 0x30]);
        self.buf.extend_from_slice(data_bytes);

        // Function 181: Print
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);

        Ok(self)
    }

    // === Paper Control ===

    /// Full cut (GS V 0)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x00]);
        self
    }

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // === Build ===

    /// Finish the receipt and return the bytes for the printer
    pub fn build(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(self.encoding.trailer());
        self.buf
    }

    /// Hand over the accumulated commands and start a fresh receipt
    pub fn take(&mut self) -> EscPosBuilder {
        std::mem::replace(self, EscPosBuilder::with_encoding(self.width, self.encoding))
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(48)
    }
}

// ============================================================================
// Image Processing
// ============================================================================

/// Convert encoded image bytes (PNG, JPEG, WebP) to GS v 0 raster data
///
/// The image is scaled down to `max_width` dots when wider, converted to
/// 1-bit monochrome and encoded as a single raster block followed by LF.
/// Transparent pixels print white.
#[cfg(feature = "image")]
pub fn rasterize_image(bytes: &[u8], max_width: u32) -> PrintResult<Vec<u8>> {
    use image::GenericImageView;

    let img = image::load_from_memory(bytes)
        .map_err(|e| PrintError::InvalidData(format!("image decode failed: {e}")))?;

    let (w, h) = img.dimensions();
    let max_width = max_width.max(8);
    let (new_w, new_h) = if w > max_width {
        let ratio = max_width as f64 / w as f64;
        (max_width, ((h as f64 * ratio) as u32).max(1))
    } else {
        (w, h)
    };
    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Nearest);

    let x_bytes = new_w.div_ceil(8);
    let mut data = Vec::with_capacity((x_bytes * new_h) as usize + 9);

    // GS v 0 m xL xH yL yH
    data.extend_from_slice(&[0x1D, 0x76, 0x30, 0x00]);
    data.push(x_bytes as u8);
    data.push((x_bytes >> 8) as u8);
    data.push(new_h as u8);
    data.push((new_h >> 8) as u8);

    let rgba = resized.to_rgba8();
    for y in 0..new_h {
        for x_byte in 0..x_bytes {
            let mut byte = 0u8;
            for bit in 0..8 {
                let x = x_byte * 8 + bit;
                if x >= new_w {
                    continue;
                }
                let pixel = rgba.get_pixel(x, y);
                if pixel[3] >= 128 {
                    let luma = 0.299 * pixel[0] as f32
                        + 0.587 * pixel[1] as f32
                        + 0.114 * pixel[2] as f32;
                    if luma < 128.0 {
                        byte |= 1 << (7 - bit);
                    }
                }
            }
            data.push(byte);
        }
    }

    data.push(0x0A);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QrErrorCorrection;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_builder_basic() {
        let mut b = EscPosBuilder::new(32);
        assert!(b.is_empty());
        b.align(Alignment::Center)
            .style(TextStyle::bold().with_size(TextSize::Large))
            .line("TITLE")
            .reset_style()
            .feed(2)
            .cut();

        let data = b.build();
        assert_eq!(&data[..5], &[0x1B, 0x40, 0x1B, 0x74, 16]);
        assert!(contains(&data, &[0x1B, 0x61, 0x01]));
        assert!(contains(&data, &[0x1B, 0x45, 0x01]));
        assert!(contains(&data, &[0x1D, 0x21, 0x11]));
        assert!(contains(&data, b"TITLE\n"));
        assert!(data.ends_with(&[0x1B, 0x64, 0x02, 0x1D, 0x56, 0x00]));
    }

    #[test]
    fn test_text_is_encoded_when_added() {
        let mut b = EscPosBuilder::new(32);
        b.text("Café €5");
        let data = b.build();
        assert_eq!(&data[5..], &[b'C', b'a', b'f', 0xE9, b' ', 0x80, b'5']);
    }

    #[test]
    fn test_gbk_builder_frames_chinese_mode() {
        let mut b = EscPosBuilder::with_encoding(32, TextEncoding::Gbk);
        assert!(b.is_empty());
        b.text("中");
        assert_eq!(
            b.build(),
            vec![0x1B, 0x40, 0x1C, 0x26, 0x1C, 0x43, 0x01, 0xD6, 0xD0, 0x1C, 0x2E]
        );
    }

    #[test]
    fn test_high_command_arguments_survive() {
        for encoding in [TextEncoding::Latin1, TextEncoding::Gbk] {
            let mut b = EscPosBuilder::with_encoding(48, encoding);
            b.feed(200);
            let data = b.build();
            assert!(
                contains(&data, &[0x1B, 0x64, 200]),
                "feed argument mangled for {encoding}"
            );
        }
    }

    #[test]
    fn test_qr_length_bytes_survive() {
        let payload = "x".repeat(130);
        for encoding in [TextEncoding::Latin1, TextEncoding::Gbk] {
            let mut b = EscPosBuilder::with_encoding(48, encoding);
            b.qr_code(&payload, QrCodeOptions::default()).unwrap();
            let data = b.build();
            // 130 + 3 = 0x85
            let mut store = vec![0x1D, 0x28, 0x6B, 0x85, 0x00, 0x31, 0x50, 0x30];
            store.extend_from_slice(payload.as_bytes());
            assert!(contains(&data, &store), "QR store mangled for {encoding}");
        }
    }

    #[test]
    fn test_qr_error_correction_level() {
        let mut b = EscPosBuilder::new(48);
        b.qr_code(
            "https://example.com",
            QrCodeOptions {
                size: 40,
                error_correction: QrErrorCorrection::H,
            },
        )
        .unwrap();
        let data = b.build();
        assert!(contains(&data, &[0x31, 0x43, 16]));
        assert!(contains(&data, &[0x31, 0x45, 0x33]));
        assert!(contains(&data, b"https://example.com"));
    }

    #[test]
    fn test_oversized_qr_is_rejected() {
        let mut b = EscPosBuilder::new(48);
        let err = b
            .qr_code(&"9".repeat(QR_MAX_BYTES + 1), QrCodeOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, PrintError::InvalidData(_)));
        assert!(b.is_empty());

        assert!(
            b.qr_code(&"9".repeat(QR_MAX_BYTES), QrCodeOptions::default())
                .is_ok()
        );
    }

    #[test]
    fn test_code128_gets_code_set() {
        let mut b = EscPosBuilder::new(48);
        b.barcode("ABC", BarcodeType::Code128, BarcodeOptions::default())
            .unwrap();
        let data = b.build();
        assert!(contains(&data, &[0x1D, 0x6B, 73, 5, b'{', b'B', b'A', b'B', b'C']));
        assert!(contains(&data, &[0x1D, 0x48, 0x02]));
    }

    #[test]
    fn test_oversized_barcode_is_rejected() {
        let mut b = EscPosBuilder::new(48);
        // 254 characters plus the {B selector
        let err = b
            .barcode(&"A".repeat(254), BarcodeType::Code128, BarcodeOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, PrintError::InvalidData(_)));
        assert!(b.is_empty());

        b.barcode(&"A".repeat(253), BarcodeType::Code128, BarcodeOptions::default())
            .unwrap();
        assert!(contains(&b.build(), &[0x1D, 0x6B, 73, 255]));
    }

    #[test]
    fn test_take_resets_buffer() {
        let mut b = EscPosBuilder::with_encoding(48, TextEncoding::Gbk);
        b.line("one");
        let taken = b.take();
        assert!(b.is_empty());
        assert!(!taken.is_empty());
        assert_eq!(b.width(), 48);
        assert_eq!(b.encoding(), TextEncoding::Gbk);
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_rasterize_rejects_garbage() {
        assert!(rasterize_image(b"not an image", 384).is_err());
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_rasterize_black_square() {
        let img = image::RgbaImage::from_pixel(16, 2, image::Rgba([0, 0, 0, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let data = rasterize_image(&png, 384).unwrap();
        assert_eq!(&data[..8], &[0x1D, 0x76, 0x30, 0x00, 2, 0, 2, 0]);
        assert_eq!(&data[8..12], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(data.last(), Some(&0x0A));
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_raster_passes_through_build() {
        // 200 dots wide gives xL = 25, every data byte 0xFF
        let img = image::RgbaImage::from_pixel(200, 3, image::Rgba([0, 0, 0, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let raster = rasterize_image(&png, 384).unwrap();
        assert!(raster.contains(&0xFF));

        for encoding in [TextEncoding::Latin1, TextEncoding::Gbk] {
            let mut b = EscPosBuilder::with_encoding(48, encoding);
            b.raw(&raster);
            assert!(contains(&b.build(), &raster), "raster mangled for {encoding}");
        }
    }
}
