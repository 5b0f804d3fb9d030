//! Snapshot store: path resolution and the update-mode switch.
//!
//! Layout on disk, under a per-test-suite base directory:
//!
//! ```text
//! <base>/snapshots/<Class>.<method>[.<label>][.<index>].<ext>   references
//! <base>/results/<same-name>.<ext>                              fresh runs
//! ```
//!
//! Both directories are auto-created and never auto-deleted. Snapshots
//! are read-only during normal runs and written only in update mode;
//! results are overwritten unconditionally on every run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SnapshotError;

/// Environment switch that turns a run into a snapshot refresh.
pub const UPDATE_ENV_VAR: &str = "UPDATE_SNAPSHOT";

/// Logical name of a snapshot: test class, test method, optional label,
/// optional positional index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotName {
    class: String,
    method: String,
    label: Option<String>,
    index: Option<usize>,
}

impl SnapshotName {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            label: None,
            index: None,
        }
    }

    /// Add a disambiguating label between the method name and the index.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the positional index of this unit within its parent result.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// File stem: `Class.method[.label][.index]`.
    pub fn stem(&self) -> String {
        let mut stem = format!("{}.{}", self.class, self.method);
        if let Some(label) = &self.label {
            stem.push('.');
            stem.push_str(label);
        }
        if let Some(index) = self.index {
            stem.push('.');
            stem.push_str(&index.to_string());
        }
        stem
    }
}

impl std::fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Whether a run compares against snapshots or replaces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Normal run: snapshots are ground truth.
    Compare,
    /// Refresh run: current results overwrite snapshots before comparison,
    /// making every comparison trivially pass.
    Update,
}

impl UpdateMode {
    /// Read the mode from the `UPDATE_SNAPSHOT` environment variable.
    /// Unset, empty, `0`, and `false` mean [`UpdateMode::Compare`].
    pub fn from_env() -> Self {
        match std::env::var(UPDATE_ENV_VAR) {
            Ok(value) if !value.is_empty() && value != "0" && value != "false" => Self::Update,
            _ => Self::Compare,
        }
    }

    pub fn is_update(self) -> bool {
        self == Self::Update
    }
}

/// Resolves logical snapshot names to files on disk.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshots_dir: PathBuf,
    results_dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at `base`, creating `snapshots/` and `results/`
    /// if they do not exist yet.
    pub fn new(base: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let base = base.as_ref();
        let snapshots_dir = base.join("snapshots");
        let results_dir = base.join("results");
        fs::create_dir_all(&snapshots_dir)?;
        fs::create_dir_all(&results_dir)?;
        Ok(Self {
            snapshots_dir,
            results_dir,
        })
    }

    pub fn snapshots_dir(&self) -> &Path {
        &self.snapshots_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Write path for a reference artifact with a known extension.
    pub fn snapshot_path(&self, name: &SnapshotName, extension: &str) -> PathBuf {
        self.snapshots_dir
            .join(format!("{}.{}", name.stem(), extension))
    }

    /// Write path for a freshly produced artifact.
    pub fn result_path(&self, name: &SnapshotName, extension: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}.{}", name.stem(), extension))
    }

    /// Persist the current run's artifact. Always overwrites; runs before
    /// any comparison so the artifact survives later failures.
    pub fn persist_result(
        &self,
        name: &SnapshotName,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, SnapshotError> {
        let path = self.result_path(name, extension);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Overwrite the stored reference with new bytes (update mode only).
    pub fn write_snapshot(
        &self,
        name: &SnapshotName,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, SnapshotError> {
        let path = self.snapshot_path(name, extension);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Find the stored reference for a logical name, whatever its format.
    ///
    /// Scans the snapshot directory for files whose stem equals the
    /// logical name. Zero matches is [`SnapshotError::MissingSnapshot`];
    /// more than one is [`SnapshotError::AmbiguousSnapshot`], since no
    /// tie-break between formats is defined.
    pub fn locate(&self, name: &SnapshotName) -> Result<PathBuf, SnapshotError> {
        let stem = name.stem();
        let mut candidates = Vec::new();

        for entry in fs::read_dir(&self.snapshots_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s == stem);
            if matches {
                candidates.push(path);
            }
        }

        candidates.sort();
        match candidates.len() {
            0 => Err(SnapshotError::MissingSnapshot {
                name: stem.clone(),
                expected: self.snapshots_dir.join(format!("{stem}.*")),
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(SnapshotError::AmbiguousSnapshot {
                name: stem,
                candidates,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stem_includes_label_and_index() {
        let name = SnapshotName::new("EndToEndSimple", "test_txt2img")
            .with_label("large")
            .with_index(2);
        assert_eq!(name.stem(), "EndToEndSimple.test_txt2img.large.2");
    }

    #[test]
    fn stem_without_label_or_index() {
        let name = SnapshotName::new("EndToEndSimple", "test_list_engines");
        assert_eq!(name.stem(), "EndToEndSimple.test_list_engines");
    }

    #[test]
    fn new_creates_directories() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        assert!(store.snapshots_dir().is_dir());
        assert!(store.results_dir().is_dir());
    }

    #[test]
    fn locate_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let name = SnapshotName::new("Suite", "test_missing").with_index(0);
        let err = store.locate(&name).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingSnapshot { .. }));
    }

    #[test]
    fn locate_finds_any_extension() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let name = SnapshotName::new("Suite", "test_webp").with_index(0);
        store.write_snapshot(&name, "webp", b"payload").unwrap();
        let found = store.locate(&name).unwrap();
        assert_eq!(found, store.snapshot_path(&name, "webp"));
    }

    #[test]
    fn locate_rejects_multiple_matches() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let name = SnapshotName::new("Suite", "test_dup").with_index(0);
        store.write_snapshot(&name, "png", b"a").unwrap();
        store.write_snapshot(&name, "webp", b"b").unwrap();
        let err = store.locate(&name).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::AmbiguousSnapshot { ref candidates, .. } if candidates.len() == 2
        ));
    }

    #[test]
    fn locate_does_not_match_prefixes() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let other = SnapshotName::new("Suite", "test_a").with_index(10);
        store.write_snapshot(&other, "png", b"x").unwrap();
        let name = SnapshotName::new("Suite", "test_a").with_index(1);
        assert!(matches!(
            store.locate(&name),
            Err(SnapshotError::MissingSnapshot { .. })
        ));
    }

    #[test]
    fn persist_result_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let name = SnapshotName::new("Suite", "test_overwrite").with_index(0);
        store.persist_result(&name, "png", b"first").unwrap();
        let path = store.persist_result(&name, "png", b"second").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"second");
    }

    #[test]
    fn update_mode_env_parsing() {
        // Serialized through a single test to avoid env races.
        std::env::remove_var(UPDATE_ENV_VAR);
        assert_eq!(UpdateMode::from_env(), UpdateMode::Compare);
        std::env::set_var(UPDATE_ENV_VAR, "0");
        assert_eq!(UpdateMode::from_env(), UpdateMode::Compare);
        std::env::set_var(UPDATE_ENV_VAR, "false");
        assert_eq!(UpdateMode::from_env(), UpdateMode::Compare);
        std::env::set_var(UPDATE_ENV_VAR, "1");
        assert_eq!(UpdateMode::from_env(), UpdateMode::Update);
        std::env::remove_var(UPDATE_ENV_VAR);
    }
}
