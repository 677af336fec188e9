//! Build manifest and incremental rebuild planning
//!
//! This crate records the last successful build state of every unit and
//! decides which units are stale on the next run.
//!
//! # Features
//!
//! - SHA256 content hashes for unit definitions
//! - A single JSON manifest file with a format version tag
//! - Fail-safe loading: a missing, corrupt or outdated manifest is treated
//!   as "nothing has been built yet"
//! - Staleness rules with cascading through rebuilt dependencies
//!
//! # Example
//!
//! ```
//! use convenient_cache::{BuildManifest, ContentHash, IncrementalPlanner, ManifestEntry};
//! use std::collections::{BTreeSet, HashMap};
//!
//! let mut manifest = BuildManifest::empty("build/manifest.json");
//! let types_v1 = ContentHash::from_content(b"type User = {}");
//! manifest.record("types", ManifestEntry::new(types_v1, BTreeSet::new(), vec![]));
//! manifest.record(
//!     "auth",
//!     ManifestEntry::new(
//!         ContentHash::from_content(b"login flow"),
//!         BTreeSet::from(["types".to_string()]),
//!         vec![],
//!     ),
//! );
//!
//! let hashes = HashMap::from([
//!     ("types".to_string(), ContentHash::from_content(b"type User = { id }")),
//!     ("auth".to_string(), ContentHash::from_content(b"login flow")),
//! ]);
//! let deps = HashMap::from([
//!     ("types".to_string(), BTreeSet::new()),
//!     ("auth".to_string(), BTreeSet::from(["types".to_string()])),
//! ]);
//!
//! let plan = IncrementalPlanner::new(&manifest).plan_rebuild(&["types", "auth"], &hashes, &deps);
//! assert_eq!(plan.units(), ["types", "auth"]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

mod manifest;
mod planner;

pub use manifest::{BuildManifest, MANIFEST_VERSION, ManifestEntry};
pub use planner::{IncrementalPlanner, RebuildPlan, StaleReason};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// Error types for manifest operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the manifest file failed
    #[error("manifest I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The manifest could not be serialized
    #[error("manifest serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid hash format
    #[error("Invalid hash: {0}")]
    InvalidHash(String),
}

/// Result type for manifest operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Content hash (SHA256)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Create a new content hash from a string
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidHash` if the hash is not a valid SHA256 hex string
    pub fn new(hash: String) -> CacheResult<Self> {
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CacheError::InvalidHash(hash));
        }
        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// Calculate SHA256 hash of content
    #[must_use]
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let result = hasher.finalize();
        Self(hex::encode(result))
    }

    /// Get the hash as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex digits, for log lines
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl TryFrom<String> for ContentHash {
    type Error = CacheError;

    fn try_from(value: String) -> CacheResult<Self> {
        Self::new(value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
