//! The result data model: what a generation call can hand back.
//!
//! `ResultValue` is a closed set of shapes; the flattener has exactly one
//! rule per variant. Results are acyclic by construction of the backend,
//! so no cycle detection is needed anywhere downstream.

use mediaproof_image::{FrameBatch, PixelBuffer};

/// The type tag of an [`Artifact`] inside an [`Answer`].
///
/// Only `Image` artifacts participate in snapshot comparison; the rest
/// pass through an answer untouched and are dropped from the flattened
/// sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Image,
    Text,
    Classifications,
}

/// A typed payload inside an [`Answer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub value: ResultValue,
}

impl Artifact {
    pub fn image(value: ResultValue) -> Self {
        Self {
            kind: ArtifactKind::Image,
            value,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Text,
            value: ResultValue::Bytes(text.into().into_bytes()),
        }
    }
}

/// A typed response envelope carrying zero or more artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer_id: String,
    pub artifacts: Vec<Artifact>,
}

impl Answer {
    pub fn new(answer_id: impl Into<String>) -> Self {
        Self {
            answer_id: answer_id.into(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }
}

/// The value returned by a generation call.
///
/// Constructed by the backend, consumed exactly once by the flattener.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// An already-encoded payload (e.g. PNG bytes straight off the wire).
    Bytes(Vec<u8>),
    /// A single in-memory frame.
    Buffer(PixelBuffer),
    /// A leading-dimension batch of frames; each frame is one unit.
    Batch(FrameBatch),
    /// An ordered sequence of nested results.
    List(Vec<ResultValue>),
    /// A typed envelope of artifacts.
    Answer(Answer),
}

/// A single comparable payload extracted from a result.
///
/// Exactly one representation is populated by construction: either raw
/// encoded bytes or an in-memory buffer still in need of encoding. The
/// unit's position in the flattened sequence names its snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicUnit {
    Bytes(Vec<u8>),
    Buffer(PixelBuffer),
}
