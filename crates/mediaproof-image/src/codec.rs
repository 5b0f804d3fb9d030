//! Media codec: deterministic PNG writing, format sniffing, decoding.
//!
//! Encoding uses fixed compression settings so the same buffer always
//! produces byte-identical output. Format identification inspects magic
//! numbers, never file extensions: result bytes can arrive from a call
//! with no name at all and must still be stored under the right extension.

use std::path::Path;

use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use thiserror::Error;

use crate::buffer::{BufferError, PixelBuffer};

/// PNG signature (8 bytes).
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Errors from codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unrecognized image format (no known signature in first bytes)")]
    UnrecognizedFormat,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),

    #[error("image decoding error: {0}")]
    Decoding(#[from] image::ImageError),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Concrete image formats the harness knows how to store and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Webp,
}

impl ImageFormat {
    /// File extension used when persisting bytes of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// PNG encoder configuration. Fixed settings keep output deterministic.
#[derive(Debug, Clone)]
pub struct PngConfig {
    /// Compression level. Fixed for determinism.
    pub compression: Compression,
    /// Filter type. `NoFilter` gives maximally stable output.
    pub filter: FilterType,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Default,
            filter: FilterType::NoFilter,
        }
    }
}

/// Identify the format of an image byte stream by signature inspection.
///
/// Recognizes PNG (8-byte signature) and WebP (RIFF container with a
/// `WEBP` fourcc at offset 8). Anything else is
/// [`CodecError::UnrecognizedFormat`].
pub fn identify(bytes: &[u8]) -> Result<ImageFormat, CodecError> {
    if bytes.len() >= 8 && bytes[0..8] == PNG_SIGNATURE {
        return Ok(ImageFormat::Png);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Ok(ImageFormat::Webp);
    }
    Err(CodecError::UnrecognizedFormat)
}

/// Encode a buffer to PNG bytes.
///
/// Deterministic for a fixed [`PngConfig`]: no timestamps or variable
/// metadata are written.
pub fn encode_png(buffer: &PixelBuffer, config: &PngConfig) -> Result<Vec<u8>, CodecError> {
    let color = match buffer.channels() {
        1 => ColorType::Grayscale,
        3 => ColorType::Rgb,
        4 => ColorType::Rgba,
        other => return Err(CodecError::Buffer(BufferError::UnsupportedChannels(other))),
    };

    let mut out = Vec::new();
    {
        let mut encoder = Encoder::new(&mut out, buffer.width(), buffer.height());
        encoder.set_color(color);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_compression(config.compression);
        encoder.set_filter(config.filter);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&buffer.to_bytes())?;
    }
    Ok(out)
}

/// Decode image bytes into a normalized RGBA buffer.
///
/// Every decode lands in the same representation (RGBA, f32 in [0, 1]) so
/// that two images are always comparable regardless of how they were
/// stored.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
    let format = match identify(bytes)? {
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Webp => image::ImageFormat::WebP,
    };
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(PixelBuffer::from_bytes(width, height, 4, rgba.as_raw())?)
}

/// Read and decode an image file.
pub fn decode_file(path: &Path) -> Result<PixelBuffer, CodecError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(x as f32 / width.max(1) as f32);
                data.push(y as f32 / height.max(1) as f32);
                data.push(0.25);
                data.push(1.0);
            }
        }
        PixelBuffer::new(width, height, 4, data).unwrap()
    }

    #[test]
    fn identify_png_signature() {
        let bytes = encode_png(&gradient(4, 4), &PngConfig::default()).unwrap();
        assert_eq!(identify(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn identify_webp_signature() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(b"WEBP");
        assert_eq!(identify(&bytes).unwrap(), ImageFormat::Webp);
    }

    #[test]
    fn identify_rejects_garbage() {
        let err = identify(b"not an image at all").unwrap_err();
        assert!(matches!(err, CodecError::UnrecognizedFormat));
    }

    #[test]
    fn identify_rejects_short_input() {
        let err = identify(&[0x89, 0x50]).unwrap_err();
        assert!(matches!(err, CodecError::UnrecognizedFormat));
    }

    #[test]
    fn encode_is_deterministic() {
        let buffer = gradient(16, 16);
        let config = PngConfig::default();
        let a = encode_png(&buffer, &config).unwrap();
        let b = encode_png(&buffer, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn encode_decode_round_trip() {
        let buffer = gradient(8, 8);
        let bytes = encode_png(&buffer, &PngConfig::default()).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.height(), 8);
        assert_eq!(decoded.channels(), 4);
        assert_eq!(decoded.to_bytes(), buffer.to_bytes());
    }

    #[test]
    fn round_trip_is_perceptually_identical() {
        let bytes = encode_png(&gradient(32, 32), &PngConfig::default()).unwrap();
        let a = decode(&bytes).unwrap();
        let b = decode(&bytes).unwrap();
        let score = crate::ssim::dissimilarity(&a, &b, crate::ssim::DEFAULT_SSIM_WINDOW).unwrap();
        assert!(score.abs() < 1e-12, "round trip should score 0, got {}", score);
    }

    #[test]
    fn decode_normalizes_rgb_to_rgba() {
        let rgb = PixelBuffer::filled(4, 4, 3, 0.5).unwrap();
        let bytes = encode_png(&rgb, &PngConfig::default()).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.channels(), 4);
    }
}
