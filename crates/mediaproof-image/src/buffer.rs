//! Normalized pixel buffers.
//!
//! All image data inside the harness travels as `f32` values in [0, 1],
//! interleaved per pixel. Quantization to bytes happens only at the codec
//! boundary.

use thiserror::Error;

/// Errors from buffer construction.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("data length {actual} does not match {width}x{height}x{channels} = {expected}")]
    LengthMismatch {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(u8),

    #[error("batch frames must share dimensions: frame 0 is {expected}, frame {index} is {actual}")]
    FrameShapeMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
}

/// An in-memory image: interleaved float pixels in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<f32>,
}

impl PixelBuffer {
    /// Create a buffer from raw float data, validating the length.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<f32>) -> Result<Self, BufferError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(BufferError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(BufferError::LengthMismatch {
                width,
                height,
                channels,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Create a buffer filled with a single value.
    pub fn filled(width: u32, height: u32, channels: u8, value: f32) -> Result<Self, BufferError> {
        let len = width as usize * height as usize * channels as usize;
        Self::new(width, height, channels, vec![value; len])
    }

    /// Create a buffer from 8-bit pixel data, normalizing to [0, 1].
    pub fn from_bytes(
        width: u32,
        height: u32,
        channels: u8,
        bytes: &[u8],
    ) -> Result<Self, BufferError> {
        let data = bytes.iter().map(|&b| f32::from(b) / 255.0).collect();
        Self::new(width, height, channels, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of pixels (not samples).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// `"WxHxC"` shape string for diagnostics.
    pub fn shape(&self) -> String {
        format!("{}x{}x{}", self.width, self.height, self.channels)
    }

    /// Quantize to interleaved 8-bit samples. Values are clamped to [0, 1].
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}

/// An ordered batch of frames sharing one set of dimensions.
///
/// Models a tensor with a leading batch dimension: a generation call that
/// produced N images at once arrives as one `FrameBatch` of N frames, and
/// the flattener splits it back into N comparable units in frame order.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch {
    frames: Vec<PixelBuffer>,
}

impl FrameBatch {
    /// Build a batch, validating that every frame has the same shape.
    pub fn new(frames: Vec<PixelBuffer>) -> Result<Self, BufferError> {
        if let Some(first) = frames.first() {
            let expected = first.shape();
            for (index, frame) in frames.iter().enumerate().skip(1) {
                if frame.shape() != expected {
                    return Err(BufferError::FrameShapeMismatch {
                        index,
                        expected,
                        actual: frame.shape(),
                    });
                }
            }
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[PixelBuffer] {
        &self.frames
    }

    /// Consume the batch, yielding frames in order.
    pub fn into_frames(self) -> Vec<PixelBuffer> {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        let err = PixelBuffer::new(2, 2, 3, vec![0.0; 11]).unwrap_err();
        assert!(matches!(err, BufferError::LengthMismatch { expected: 12, actual: 11, .. }));
    }

    #[test]
    fn new_rejects_two_channels() {
        let err = PixelBuffer::new(1, 1, 2, vec![0.0; 2]).unwrap_err();
        assert!(matches!(err, BufferError::UnsupportedChannels(2)));
    }

    #[test]
    fn byte_round_trip() {
        let bytes: Vec<u8> = vec![0, 51, 102, 153, 204, 255];
        let buffer = PixelBuffer::from_bytes(2, 1, 3, &bytes).unwrap();
        assert_eq!(buffer.to_bytes(), bytes);
    }

    #[test]
    fn to_bytes_clamps_out_of_range() {
        let buffer = PixelBuffer::new(1, 1, 3, vec![-0.5, 0.5, 1.5]).unwrap();
        assert_eq!(buffer.to_bytes(), vec![0, 128, 255]);
    }

    #[test]
    fn batch_rejects_mixed_shapes() {
        let a = PixelBuffer::filled(2, 2, 3, 0.0).unwrap();
        let b = PixelBuffer::filled(4, 2, 3, 0.0).unwrap();
        let err = FrameBatch::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, BufferError::FrameShapeMismatch { index: 1, .. }));
    }

    #[test]
    fn batch_preserves_frame_order() {
        let frames: Vec<PixelBuffer> = (0..3)
            .map(|i| PixelBuffer::filled(2, 2, 1, i as f32 / 4.0).unwrap())
            .collect();
        let batch = FrameBatch::new(frames.clone()).unwrap();
        assert_eq!(batch.into_frames(), frames);
    }
}
