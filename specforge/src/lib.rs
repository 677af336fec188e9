//! Specforge - incremental build scheduler for specification units
//!
//! Specforge turns a set of named units with declared dependencies into
//! compiled artifacts. It is a thin orchestration layer over:
//! - **convenient-graph**: dependency graph, build order, build levels,
//!   affected sets
//! - **convenient-cache**: content hashes, the build manifest and staleness
//!   planning
//!
//! Parsing unit definitions and compiling them are left to the two seams
//! [`UnitSource`] and [`UnitCompiler`].
//!
//! ## Usage
//!
//! ```no_run
//! use specforge::*;
//! use std::sync::Arc;
//! # async fn example() -> Result<()> {
//! let project = Project::load("specforge.yml")?;
//! let forge = BuildOrchestrator::new(
//!     Arc::new(project.unit_source()),
//!     Arc::new(project.compiler()?),
//!     project.manifest_path(),
//! );
//!
//! let result = forge.build(None, &BuildOptions::default()).await?;
//! println!("{} compiled, {} up to date", result.compiled.len(), result.skipped.len());
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod error;
pub mod orchestrator;
pub mod project;
pub mod source;

pub use compiler::{CommandCompiler, CompileError, CompileOutput, UnitCompiler};
pub use error::{ForgeError, Result};
pub use orchestrator::{BuildOptions, BuildOrchestrator, BuildResult, FailurePolicy};
pub use project::{Project, ProjectConfig, ProjectUnitSource};
pub use source::{InMemoryUnitSource, Unit, UnitSource};

// Re-export the scheduling building blocks
pub use convenient_cache::{BuildManifest, ContentHash, RebuildPlan, StaleReason};
pub use convenient_graph::{DependencyGraph, GraphError};
