//! Failure taxonomy for snapshot comparison.
//!
//! Every variant terminates the current test case; nothing here is
//! recoverable mid-test. Result artifacts already written to disk stay
//! there for post-mortem inspection regardless of which variant fires.

use std::path::PathBuf;

use thiserror::Error;

use mediaproof_image::{CodecError, CompareError};

/// Errors raised by the snapshot lifecycle and comparator dispatch.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No reference artifact exists for a logical name.
    #[error("no snapshot found for `{name}` (expected at {})", .expected.display())]
    MissingSnapshot { name: String, expected: PathBuf },

    /// More than one stored file matches the same logical name. The store
    /// defines no tie-break, so this is an error rather than an arbitrary
    /// pick.
    #[error("multiple snapshots match `{name}`: {candidates:?}")]
    AmbiguousSnapshot {
        name: String,
        candidates: Vec<PathBuf>,
    },

    /// Perceptual score above the configured threshold.
    #[error("perceptual dissimilarity {score:.6} exceeds threshold {threshold} for `{name}`")]
    ThresholdExceeded {
        name: String,
        score: f64,
        threshold: f64,
    },

    /// Filtered structured result differs from the stored snapshot.
    #[error(
        "structured result differs from snapshot `{name}`\n  result:   {result}\n  snapshot: {snapshot}"
    )]
    StructuralMismatch {
        name: String,
        result: String,
        snapshot: String,
    },

    /// The dispatcher received a content kind it cannot compare.
    #[error("unsupported content kind `{0}`")]
    UnsupportedKind(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Perceptual(#[from] CompareError),

    #[error("invalid structured payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
