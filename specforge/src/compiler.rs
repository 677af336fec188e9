//! The unit compiler seam and a command-line backed implementation.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Artifacts produced by one successful compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileOutput {
    /// Files written by the compiler
    pub output_files: Vec<PathBuf>,
}

/// A failed compilation. Recorded per unit, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    message: String,
}

impl CompileError {
    /// Failure with a human-readable message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Compiles a single unit into artifacts.
///
/// Called at most once per unit per build. Calls for units in the same
/// build level may run concurrently.
#[async_trait]
pub trait UnitCompiler: Send + Sync {
    /// Compile `unit`.
    async fn compile(&self, unit: &str) -> Result<CompileOutput, CompileError>;
}

/// Runs an external command once per unit.
///
/// The command sees `SPECFORGE_UNIT` (the unit name) and, when known,
/// `SPECFORGE_SPEC` (the unit's definition file). Every non-empty stdout line
/// is taken as a produced file. A non-zero exit fails the unit with the
/// command's stderr as the message.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    specs: HashMap<String, PathBuf>,
}

impl CommandCompiler {
    /// Compiler running `program` with `args`.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            specs: HashMap::new(),
        }
    }

    /// Run the command from `dir`.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Definition files exported as `SPECFORGE_SPEC`.
    #[must_use]
    pub fn with_specs(mut self, specs: HashMap<String, PathBuf>) -> Self {
        self.specs = specs;
        self
    }
}

#[async_trait]
impl UnitCompiler for CommandCompiler {
    async fn compile(&self, unit: &str) -> Result<CompileOutput, CompileError> {
        let mut command = Command::new(&self.program);
        let _ = command.args(&self.args).env("SPECFORGE_UNIT", unit);
        if let Some(spec) = self.specs.get(unit) {
            let _ = command.env("SPECFORGE_SPEC", spec);
        }
        if let Some(dir) = &self.working_dir {
            let _ = command.current_dir(dir);
        }

        debug!("Running {} for {}", self.program, unit);
        let output = command
            .output()
            .await
            .map_err(|e| CompileError::new(format!("failed to run `{}`: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(CompileError::new(if stderr.is_empty() {
                format!("`{}` exited with {}", self.program, output.status)
            } else {
                stderr.to_string()
            }));
        }

        let output_files = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();

        Ok(CompileOutput { output_files })
    }
}
