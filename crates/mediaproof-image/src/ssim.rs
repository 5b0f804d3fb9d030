//! Windowed structural-similarity dissimilarity.
//!
//! Scores are loss-shaped: 0 means identical, larger means more different.
//! For an image pair with mean windowed SSIM `s`, the score is
//! `(1 - s) / 2`, computed per channel over normalized [0, 1] floats.

use thiserror::Error;

use crate::buffer::PixelBuffer;

/// SSIM stability constants, scaled for a dynamic range of 1.0.
/// c1 = (K1 * L)^2 with K1 = 0.01, c2 = (K2 * L)^2 with K2 = 0.03.
const SSIM_C1: f64 = 0.0001;
const SSIM_C2: f64 = 0.0009;

/// Default comparison window size in pixels.
pub const DEFAULT_SSIM_WINDOW: usize = 21;

/// Default pass threshold for the dissimilarity score.
pub const DEFAULT_SSIM_THRESHOLD: f64 = 0.05;

/// Errors from perceptual comparison.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("image dimensions differ: {a} vs {b} (resizing is a caller responsibility)")]
    DimensionMismatch { a: String, b: String },

    #[error("window size must be at least 1")]
    InvalidWindow,
}

/// Compute the perceptual dissimilarity between two images.
///
/// Both buffers must share dimensions and channel count; no resizing is
/// performed. The score is averaged over `window` x `window` tiles of
/// every channel. Identical images score exactly 0.
pub fn dissimilarity(
    a: &PixelBuffer,
    b: &PixelBuffer,
    window: usize,
) -> Result<f64, CompareError> {
    if window == 0 {
        return Err(CompareError::InvalidWindow);
    }
    if a.width() != b.width() || a.height() != b.height() || a.channels() != b.channels() {
        return Err(CompareError::DimensionMismatch {
            a: a.shape(),
            b: b.shape(),
        });
    }

    let width = a.width() as usize;
    let height = a.height() as usize;
    let channels = a.channels() as usize;

    if width == 0 || height == 0 {
        return Ok(0.0);
    }

    let mut ssim_sum = 0.0;
    let mut window_count = 0usize;

    for channel in 0..channels {
        let plane_a = extract_channel(a.data(), width, height, channels, channel);
        let plane_b = extract_channel(b.data(), width, height, channels, channel);

        let tiles_x = width / window;
        let tiles_y = height / window;

        if tiles_x == 0 || tiles_y == 0 {
            // Image smaller than the window: fall back to one global tile.
            ssim_sum += ssim_tile(&plane_a, &plane_b);
            window_count += 1;
            continue;
        }

        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let mut tile_a = Vec::with_capacity(window * window);
                let mut tile_b = Vec::with_capacity(window * window);
                for dy in 0..window {
                    for dx in 0..window {
                        let idx = (ty * window + dy) * width + tx * window + dx;
                        tile_a.push(plane_a[idx]);
                        tile_b.push(plane_b[idx]);
                    }
                }
                ssim_sum += ssim_tile(&tile_a, &tile_b);
                window_count += 1;
            }
        }
    }

    let mean_ssim = ssim_sum / window_count as f64;
    // SSIM of 1.0 is identical; map to a loss in [0, 1].
    Ok(((1.0 - mean_ssim) / 2.0).max(0.0))
}

fn extract_channel(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    channel: usize,
) -> Vec<f64> {
    (0..width * height)
        .map(|i| f64::from(data[i * channels + channel]))
        .collect()
}

/// SSIM for one tile of matched samples.
fn ssim_tile(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if n == 0.0 {
        return 1.0;
    }

    let mean_a: f64 = a.iter().sum::<f64>() / n;
    let mean_b: f64 = b.iter().sum::<f64>() / n;

    let mut var_a = 0.0;
    let mut var_b = 0.0;
    let mut cov_ab = 0.0;

    for i in 0..a.len() {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        var_a += da * da;
        var_b += db * db;
        cov_ab += da * db;
    }

    var_a /= n;
    var_b /= n;
    cov_ab /= n;

    let numerator = (2.0 * mean_a * mean_b + SSIM_C1) * (2.0 * cov_ab + SSIM_C2);
    let denominator =
        (mean_a * mean_a + mean_b * mean_b + SSIM_C1) * (var_a + var_b + SSIM_C2);

    numerator / denominator
}
