//! Read-only commands: build order, levels, affected units, rebuild plan

use super::{open_read_only, selection};
use std::path::Path;

type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Print the linear build order, one unit per line
pub fn order(project: &Path, units: &[String]) -> CommandResult {
    let forge = open_read_only(project)?;
    for name in forge.resolve_build_order(selection(units))? {
        println!("{name}");
    }
    Ok(())
}

/// Print the build levels, one level per line
pub fn levels(project: &Path, units: &[String]) -> CommandResult {
    let forge = open_read_only(project)?;
    for (index, level) in forge.parallel_build_order(selection(units))?.iter().enumerate() {
        println!("{index}: {}", level.join(" "));
    }
    Ok(())
}

/// Print `unit` and its transitive dependents in build order
pub fn affected(project: &Path, unit: &str) -> CommandResult {
    let forge = open_read_only(project)?;
    let affected = forge.affected_units(unit, None)?;
    if affected.is_empty() {
        println!("⚠️  {unit} is not part of the project");
    }
    for name in affected {
        println!("{name}");
    }
    Ok(())
}

/// Show the rebuild plan with the reason for each unit
pub fn plan(project: &Path, units: &[String], full: bool) -> CommandResult {
    let forge = open_read_only(project)?;
    let plan = forge.plan(selection(units), !full)?;

    if plan.is_empty() {
        println!("✅ Everything is up to date");
        return Ok(());
    }

    println!("📋 {} units to build:", plan.len());
    for name in plan.units() {
        match plan.reason(name) {
            Some(reason) => println!("  • {name} ({reason})"),
            None => println!("  • {name}"),
        }
    }
    Ok(())
}
