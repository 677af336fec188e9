//! Build command

use super::{open, selection};
use specforge::{BuildOptions, BuildResult, FailurePolicy, UnitCompiler};
use std::path::Path;
use std::sync::Arc;

/// Command-line build flags
pub struct BuildArgs<'a> {
    pub units: &'a [String],
    pub full: bool,
    pub parallel: bool,
    pub jobs: Option<usize>,
    pub skip_dependents: bool,
    pub json: bool,
}

impl BuildArgs<'_> {
    fn options(&self) -> BuildOptions {
        let defaults = BuildOptions::default();
        BuildOptions {
            incremental: !self.full,
            parallel: self.parallel,
            max_workers: self.jobs.unwrap_or(defaults.max_workers),
            failure_policy: if self.skip_dependents {
                FailurePolicy::SkipDependents
            } else {
                FailurePolicy::Continue
            },
        }
    }
}

/// Run a build; returns whether every unit succeeded
pub async fn execute(
    project: &Path,
    args: &BuildArgs<'_>,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let forge = open(project, |project| {
        Ok(Arc::new(project.compiler()?) as Arc<dyn UnitCompiler>)
    })?;

    let result = forge.build(selection(args.units), &args.options()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        display(&result);
    }
    Ok(result.success)
}

fn display(result: &BuildResult) {
    println!("\n📊 Build Summary:");
    println!("  Compiled: {}", result.compiled.len());
    println!("  Skipped:  {}", result.skipped.len());
    println!("  Failed:   {}", result.failed.len());
    println!("  Duration: {:.2}s", result.duration.as_secs_f64());

    if !result.errors.is_empty() {
        println!("\n❌ Failures:");
        for (name, message) in &result.errors {
            println!("  • {name}: {message}");
        }
    } else if result.compiled.is_empty() {
        println!("\n✅ Everything is up to date");
    } else {
        println!("\n✅ Build succeeded");
    }
}
