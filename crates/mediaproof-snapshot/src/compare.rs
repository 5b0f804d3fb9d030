//! Comparator dispatch and the per-unit comparison lifecycle.
//!
//! Each atomic unit moves through the same states: produced (result bytes
//! written, unconditionally), located (reference found on disk, or copied
//! there first in update mode), compared (perceptually or structurally,
//! by declared content kind), then passed or failed. Every step is a
//! separately callable function; [`check_unit`] is the composition.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use mediaproof_image::{
    decode_file, dissimilarity, encode_png, identify, PngConfig, DEFAULT_SSIM_THRESHOLD,
    DEFAULT_SSIM_WINDOW,
};

use crate::error::SnapshotError;
use crate::flatten::flatten;
use crate::result::{AtomicUnit, ResultValue};
use crate::store::{SnapshotName, SnapshotStore, UpdateMode};

/// Declared content kind of a produced result.
///
/// The mapping from the wire `Content-Type` string is total: anything the
/// dispatcher does not know how to compare lands in `Unsupported`, which
/// fails hard at comparison time rather than being skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// Binary image payload; compared perceptually.
    ImagePng,
    /// Structured payload; compared by canonical serialization equality.
    Json,
    /// Anything else. Carries the offending media type for diagnostics.
    Unsupported(String),
}

impl ContentKind {
    /// Map a `Content-Type` header value to a kind.
    ///
    /// Parameters after `;` are ignored and matching is ASCII
    /// case-insensitive.
    pub fn from_header(raw: &str) -> Self {
        let essence = raw
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Self::ImagePng,
            "application/json" => Self::Json,
            _ => Self::Unsupported(essence),
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImagePng => f.write_str("image/png"),
            Self::Json => f.write_str("application/json"),
            Self::Unsupported(kind) => f.write_str(kind),
        }
    }
}

/// A filter applied to the structured *result* (never the snapshot)
/// before comparison, e.g. to trim volatile fields.
pub type StructuredFilter<'a> = &'a dyn Fn(Value) -> Value;

/// Knobs for a snapshot check.
pub struct CheckOptions<'a> {
    /// Pass criterion for images: `score <= threshold`.
    pub threshold: f64,
    /// SSIM window size in pixels.
    pub window: usize,
    /// Compare against snapshots, or refresh them first.
    pub update: UpdateMode,
    /// Optional result filter for structured payloads.
    pub filter: Option<StructuredFilter<'a>>,
    /// Encoder settings for buffer units.
    pub png: PngConfig,
}

impl Default for CheckOptions<'_> {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SSIM_THRESHOLD,
            window: DEFAULT_SSIM_WINDOW,
            update: UpdateMode::Compare,
            filter: None,
            png: PngConfig::default(),
        }
    }
}

impl<'a> CheckOptions<'a> {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_update(mut self, update: UpdateMode) -> Self {
        self.update = update;
        self
    }

    pub fn with_filter(mut self, filter: StructuredFilter<'a>) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// What a passed check looked like, for diagnostics and reporting.
#[derive(Debug)]
pub struct UnitOutcome {
    pub result_path: PathBuf,
    pub snapshot_path: PathBuf,
    /// Perceptual score for image units; `None` for structured units.
    pub score: Option<f64>,
}

/// Run the full lifecycle for one unit: persist, locate, compare.
pub fn check_unit(
    store: &SnapshotStore,
    name: &SnapshotName,
    kind: &ContentKind,
    bytes: &[u8],
    options: &CheckOptions<'_>,
) -> Result<UnitOutcome, SnapshotError> {
    match kind {
        ContentKind::ImagePng => check_image_unit(store, name, bytes, options),
        ContentKind::Json => check_structured_unit(store, name, bytes, options),
        ContentKind::Unsupported(kind) => Err(SnapshotError::UnsupportedKind(kind.clone())),
    }
}

fn check_image_unit(
    store: &SnapshotStore,
    name: &SnapshotName,
    bytes: &[u8],
    options: &CheckOptions<'_>,
) -> Result<UnitOutcome, SnapshotError> {
    // Extension comes from the bytes themselves; payloads off the wire
    // arrive nameless.
    let format = identify(bytes)?;
    let result_path = store.persist_result(name, format.extension(), bytes)?;

    if options.update.is_update() {
        store.write_snapshot(name, format.extension(), bytes)?;
    }

    let snapshot_path = store.locate(name)?;
    let score = compare_image_files(&result_path, &snapshot_path, options.window)?;
    if score > options.threshold {
        return Err(SnapshotError::ThresholdExceeded {
            name: name.stem(),
            score,
            threshold: options.threshold,
        });
    }

    Ok(UnitOutcome {
        result_path,
        snapshot_path,
        score: Some(score),
    })
}

fn check_structured_unit(
    store: &SnapshotStore,
    name: &SnapshotName,
    bytes: &[u8],
    options: &CheckOptions<'_>,
) -> Result<UnitOutcome, SnapshotError> {
    // The filtered canonical form is what gets persisted, so the result
    // directory holds exactly what was compared.
    let canonical = canonicalize_structured(bytes, options.filter)?;
    let result_path = store.persist_result(name, "json", canonical.as_bytes())?;

    if options.update.is_update() {
        store.write_snapshot(name, "json", canonical.as_bytes())?;
    }

    let snapshot_path = store.locate(name)?;
    compare_structured(&canonical, &snapshot_path, &name.stem())?;

    Ok(UnitOutcome {
        result_path,
        snapshot_path,
        score: None,
    })
}

/// Flatten a result and check every atomic unit, naming units by index.
///
/// Buffer units are encoded to PNG first; byte units are compared as-is.
/// Returns the number of units checked. Zero means the result flattened
/// to nothing; a caller that expected output must treat that as failure.
pub fn check_flattened(
    store: &SnapshotStore,
    base: &SnapshotName,
    value: ResultValue,
    options: &CheckOptions<'_>,
) -> Result<usize, SnapshotError> {
    let mut count = 0;
    for (index, unit) in flatten(value).enumerate() {
        let name = base.clone().with_index(index);
        let bytes = match unit {
            AtomicUnit::Buffer(buffer) => encode_png(&buffer, &options.png)?,
            AtomicUnit::Bytes(bytes) => bytes,
        };
        check_unit(store, &name, &ContentKind::ImagePng, &bytes, options)?;
        count += 1;
    }
    Ok(count)
}

/// Parse a structured payload, apply the optional filter, and serialize
/// canonically (key order preserved from the document).
pub fn canonicalize_structured(
    bytes: &[u8],
    filter: Option<StructuredFilter<'_>>,
) -> Result<String, SnapshotError> {
    let mut value: Value = serde_json::from_slice(bytes)?;
    if let Some(filter) = filter {
        value = filter(value);
    }
    Ok(serde_json::to_string(&value)?)
}

/// Decode two image files and compute their perceptual dissimilarity.
/// Does not enforce a threshold; that belongs to the caller.
pub fn compare_image_files(
    result_path: &Path,
    snapshot_path: &Path,
    window: usize,
) -> Result<f64, SnapshotError> {
    let result = decode_file(result_path)?;
    let snapshot = decode_file(snapshot_path)?;
    Ok(dissimilarity(&result, &snapshot, window)?)
}

/// Compare a canonical structured result against a stored snapshot file.
pub fn compare_structured(
    result_canonical: &str,
    snapshot_path: &Path,
    name: &str,
) -> Result<(), SnapshotError> {
    let snapshot_bytes = fs::read(snapshot_path)?;
    let snapshot: Value = serde_json::from_slice(&snapshot_bytes)?;
    let snapshot_canonical = serde_json::to_string(&snapshot)?;

    if result_canonical != snapshot_canonical {
        return Err(SnapshotError::StructuralMismatch {
            name: name.to_string(),
            result: result_canonical.to_string(),
            snapshot: snapshot_canonical,
        });
    }
    Ok(())
}
