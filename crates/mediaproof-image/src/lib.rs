//! Image primitives for the mediaproof regression harness.
//!
//! This crate owns everything pixel-shaped:
//!
//! - [`PixelBuffer`]: a normalized float pixel container ([0, 1] values)
//! - [`FrameBatch`]: a leading-dimension batch of uniformly sized frames
//! - [`codec`]: deterministic PNG encoding, magic-number format sniffing,
//!   and decoding of persisted snapshots
//! - [`ssim`]: windowed structural-similarity dissimilarity scoring
//!
//! Comparison semantics live one level up, in `mediaproof-snapshot`; this
//! crate only answers "what are these bytes" and "how different are these
//! two images".

pub mod buffer;
pub mod codec;
pub mod ssim;

pub use buffer::{BufferError, FrameBatch, PixelBuffer};
pub use codec::{decode, decode_file, encode_png, identify, CodecError, ImageFormat, PngConfig};
pub use ssim::{dissimilarity, CompareError, DEFAULT_SSIM_THRESHOLD, DEFAULT_SSIM_WINDOW};
