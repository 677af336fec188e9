//! Persisted record of the last successful build of every unit.
//!
//! The manifest is a single JSON file:
//!
//! ```json
//! {
//!   "version": 1,
//!   "units": {
//!     "auth": {
//!       "content_hash": "…",
//!       "dependencies": ["types"],
//!       "built_at": "2026-01-01T00:00:00Z",
//!       "output_files": ["gen/auth.rs"]
//!     }
//!   }
//! }
//! ```
//!
//! Loading is fail-safe: a missing, unreadable, corrupt or
//! version-mismatched file yields an empty manifest, which makes every unit
//! stale and triggers a full rebuild.

use crate::{CacheError, CacheResult, ContentHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current manifest format version. Files with any other version are ignored.
pub const MANIFEST_VERSION: u32 = 1;

/// State of one unit at its last successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Content hash of the unit definition that was built
    pub content_hash: ContentHash,

    /// Dependency names declared at build time
    pub dependencies: BTreeSet<String>,

    /// When the build finished
    pub built_at: DateTime<Utc>,

    /// Artifacts produced by the compiler
    pub output_files: Vec<PathBuf>,
}

impl ManifestEntry {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(
        content_hash: ContentHash,
        dependencies: BTreeSet<String>,
        output_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            content_hash,
            dependencies,
            built_at: Utc::now(),
            output_files,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ManifestFile {
    version: u32,
    units: BTreeMap<String, ManifestEntry>,
}

/// Build manifest bound to one file on disk.
///
/// Entries are only ever replaced wholesale through [`BuildManifest::record`];
/// there is no partial update of an entry.
#[derive(Debug, Clone)]
pub struct BuildManifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl BuildManifest {
    /// An empty manifest that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the manifest stored at `path`.
    ///
    /// Never fails: any problem reading or parsing the file is logged and an
    /// empty manifest is returned instead.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No build manifest at {}", path.display());
                return Self::empty(path);
            }
            Err(e) => {
                warn!("Ignoring unreadable build manifest {}: {}", path.display(), e);
                return Self::empty(path);
            }
        };

        match serde_json::from_str::<ManifestFile>(&content) {
            Ok(file) if file.version == MANIFEST_VERSION => {
                info!("Loaded {} manifest entries from {}", file.units.len(), path.display());
                Self {
                    path,
                    entries: file.units,
                }
            }
            Ok(file) => {
                warn!(
                    "Ignoring build manifest {} with version {} (expected {})",
                    path.display(),
                    file.version,
                    MANIFEST_VERSION
                );
                Self::empty(path)
            }
            Err(e) => {
                warn!("Ignoring corrupt build manifest {}: {}", path.display(), e);
                Self::empty(path)
            }
        }
    }

    /// Write the manifest to its file, creating parent directories.
    ///
    /// The file is written to a sibling temporary path first and renamed into
    /// place, so an interrupted save never leaves a truncated manifest.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file cannot be written and
    /// `CacheError::Serialization` if encoding fails.
    pub fn save(&self) -> CacheResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = ManifestFile {
            version: MANIFEST_VERSION,
            units: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!("Saved {} manifest entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry for `name`, if it was ever built successfully.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.get(name)
    }

    /// Record a successful build of `name`, replacing any previous entry.
    pub fn record(&mut self, name: impl Into<String>, entry: ManifestEntry) {
        let _ = self.entries.insert(name.into(), entry);
    }

    /// Forget `name`, forcing it to rebuild next time.
    pub fn remove(&mut self, name: &str) -> Option<ManifestEntry> {
        self.entries.remove(name)
    }

    /// Forget every unit.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of recorded units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded units in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &[u8], deps: &[&str]) -> ManifestEntry {
        ManifestEntry::new(
            ContentHash::from_content(content),
            deps.iter().map(|d| (*d).to_string()).collect(),
            vec![PathBuf::from(format!("gen/{}.rs", String::from_utf8_lossy(content)))],
        )
    }

    #[test]
    fn test_new_manifest_is_empty() {
        let m = BuildManifest::empty("manifest.json");
        assert!(m.is_empty());
        assert_eq!(m.len(), 0);
        assert!(m.get("anything").is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        let mut m = BuildManifest::empty(&path);
        m.record("types", entry(b"types", &[]));
        m.record("auth", entry(b"auth", &["types"]));
        m.save().unwrap();

        let loaded = BuildManifest::load(&path);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("auth"), m.get("auth"));
        assert_eq!(
            loaded.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["auth", "types"]
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_nonexistent_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let m = BuildManifest::load(dir.path().join("missing.json"));
        assert!(m.is_empty());
    }

    #[test]
    fn test_load_corrupt_json_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "not valid json {{{").unwrap();
        assert!(BuildManifest::load(&path).is_empty());
    }

    #[test]
    fn test_load_version_mismatch_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"{"version": 999, "units": {}}"#).unwrap();
        assert!(BuildManifest::load(&path).is_empty());
    }

    #[test]
    fn test_load_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BuildManifest::load(dir.path()).is_empty());
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deeply").join("nested").join("manifest.json");
        BuildManifest::empty(&nested).save().unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_record_replaces_and_remove_forgets() {
        let mut m = BuildManifest::empty("manifest.json");
        m.record("auth", entry(b"v1", &[]));
        m.record("auth", entry(b"v2", &["types"]));
        assert_eq!(m.len(), 1);
        assert_eq!(
            m.get("auth").map(|e| &e.content_hash),
            Some(&ContentHash::from_content(b"v2"))
        );

        assert!(m.remove("auth").is_some());
        assert!(m.remove("auth").is_none());

        m.record("a", entry(b"a", &[]));
        m.record("b", entry(b"b", &[]));
        m.clear();
        assert!(m.is_empty());
    }
}
