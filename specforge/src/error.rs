//! Errors that abort a scheduling call before any unit is compiled.
//!
//! Per-unit compile failures are not errors at this level; they are recorded
//! in [`crate::BuildResult`].

use convenient_cache::CacheError;
use convenient_graph::GraphError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal scheduler errors
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Cycle or missing dependency in the unit graph
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Manifest could not be written
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The unit source does not know this name
    #[error("unknown unit `{0}`")]
    UnknownUnit(String),

    /// A unit's definition could not be read
    #[error("cannot read unit `{unit}` from {path}: {source}")]
    UnitRead {
        /// Unit name
        unit: String,
        /// Definition file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The project file could not be read
    #[error("cannot read project file {path}: {source}")]
    ProjectRead {
        /// Project file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The project file is not valid YAML for a project
    #[error("invalid project file {path}: {source}")]
    ProjectParse {
        /// Project file path
        path: PathBuf,
        /// Parser error
        source: serde_yaml::Error,
    },

    /// The project file parsed but describes an unusable project
    #[error("invalid project file {path}: {message}")]
    ProjectInvalid {
        /// Project file path
        path: PathBuf,
        /// What is wrong
        message: String,
    },
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, ForgeError>;
