//! Snapshot comparison core for the mediaproof regression harness.
//!
//! A generation call returns an arbitrarily shaped [`ResultValue`] — a raw
//! byte payload, a pixel buffer, a batched set of frames, a list, or a
//! typed [`Answer`] envelope. This crate reduces that value to a flat
//! sequence of comparable units ([`flatten()`]), persists each unit next to
//! its stored reference ([`SnapshotStore`]), and compares the two —
//! perceptually for images, structurally for JSON ([`check_unit`]).
//!
//! Both invocation paths of the harness (external HTTP black-box tests and
//! in-process white-box tests) funnel into the same functions here, so
//! comparison semantics cannot drift between them.
//!
//! # Modules
//!
//! - [`result`]: the closed result/artifact data model
//! - [`flatten`]: the lazy, order-preserving output flattener
//! - [`store`]: snapshot/result path resolution and the update mode
//! - [`compare`]: content-kind dispatch and the comparison lifecycle
//! - [`error`]: the failure taxonomy

pub mod compare;
pub mod error;
pub mod flatten;
pub mod result;
pub mod store;

pub use compare::{
    canonicalize_structured, check_flattened, check_unit, compare_image_files,
    compare_structured, CheckOptions, ContentKind, StructuredFilter, UnitOutcome,
};
pub use error::SnapshotError;
pub use flatten::{flatten, Flattened};
pub use result::{Answer, Artifact, ArtifactKind, AtomicUnit, ResultValue};
pub use store::{SnapshotName, SnapshotStore, UpdateMode, UPDATE_ENV_VAR};
