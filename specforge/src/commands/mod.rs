//! Specforge command-line interface
//!
//! Specforge supports these modes of operation:
//! - `order` / `levels`: Show the build schedule
//! - `affected`: Show what a change to one unit invalidates
//! - `plan`: Show what the next build would compile, and why
//! - `build`: Compile stale units
//! - `clean`: Forget build history

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use specforge::{BuildOrchestrator, CompileError, CompileOutput, Project, UnitCompiler};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod build;
pub mod clean;
pub mod query;

/// Specforge - incremental build scheduler for specification units
#[derive(Parser)]
#[command(name = "specforge")]
#[command(about = "Incremental, dependency-ordered build scheduler for specification units")]
#[command(version)]
pub struct Cli {
    /// Path to the project file
    #[arg(short, long, global = true, default_value = "specforge.yml")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the linear build order
    Order {
        /// Restrict to these units (and the units they depend on)
        units: Vec<String>,
    },

    /// Print the parallel build levels
    Levels {
        /// Restrict to these units (and the units they depend on)
        units: Vec<String>,
    },

    /// Print a unit and everything that depends on it, in build order
    Affected {
        /// The changed unit
        unit: String,
    },

    /// Show which units the next build would compile
    Plan {
        /// Plan a full rebuild
        #[arg(long)]
        full: bool,

        /// Restrict to these units (and the units they depend on)
        units: Vec<String>,
    },

    /// Compile stale units
    Build {
        /// Rebuild every unit regardless of the manifest
        #[arg(long)]
        full: bool,

        /// Compile independent units concurrently
        #[arg(long)]
        parallel: bool,

        /// Maximum concurrent compilations (defaults to the CPU count)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Do not compile units whose dependencies failed in this run
        #[arg(long)]
        skip_dependents: bool,

        /// Print the build result as JSON (`build_order` is the linear
        /// order, also for parallel builds)
        #[arg(long)]
        json: bool,

        /// Restrict to these units (and the units they depend on)
        units: Vec<String>,
    },

    /// Clear the build manifest so the next build compiles everything
    Clean,
}

/// Empty selections mean "every unit".
pub fn selection(units: &[String]) -> Option<&[String]> {
    (!units.is_empty()).then_some(units)
}

/// Load the project and wire an orchestrator with `compiler`.
pub fn open(
    project_file: &Path,
    compiler: impl FnOnce(&Project) -> specforge::Result<Arc<dyn UnitCompiler>>,
) -> specforge::Result<BuildOrchestrator> {
    let project = Project::load(project_file)?;
    let compiler = compiler(&project)?;
    Ok(BuildOrchestrator::new(
        Arc::new(project.unit_source()),
        compiler,
        project.manifest_path(),
    ))
}

/// Stand-in compiler for commands that never compile.
struct NoCompiler;

#[async_trait]
impl UnitCompiler for NoCompiler {
    async fn compile(&self, unit: &str) -> Result<CompileOutput, CompileError> {
        Err(CompileError::new(format!("{unit}: this command does not compile units")))
    }
}

/// Orchestrator for commands that only read the schedule or the manifest.
pub fn open_read_only(project_file: &Path) -> specforge::Result<BuildOrchestrator> {
    open(project_file, |_| Ok(Arc::new(NoCompiler) as Arc<dyn UnitCompiler>))
}
