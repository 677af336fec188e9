//! Specforge - incremental build scheduler for specification units
//!
//! Loads a `specforge.yml` project and:
//! 1. Resolves the dependency graph of its units
//! 2. Orders it (linear or in parallel levels)
//! 3. Plans the rebuild against the build manifest
//! 4. Compiles stale units with the configured compiler command

mod commands;

use clap::Parser;
use commands::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Logs go to stderr so that `--json` output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "specforge=info,convenient_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let project = cli.project.as_path();

    match cli.command {
        Commands::Order { units } => commands::query::order(project, &units)?,
        Commands::Levels { units } => commands::query::levels(project, &units)?,
        Commands::Affected { unit } => commands::query::affected(project, &unit)?,
        Commands::Plan { full, units } => commands::query::plan(project, &units, full)?,
        Commands::Build {
            full,
            parallel,
            jobs,
            skip_dependents,
            json,
            units,
        } => {
            let args = commands::build::BuildArgs {
                units: &units,
                full,
                parallel,
                jobs,
                skip_dependents,
                json,
            };
            if !commands::build::execute(project, &args).await? {
                std::process::exit(1);
            }
        }
        Commands::Clean => commands::clean::clean(project)?,
    }

    Ok(())
}
