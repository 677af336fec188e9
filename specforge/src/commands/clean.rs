//! Build history management

use super::open_read_only;
use std::path::Path;

/// Clear the build manifest
pub fn clean(project: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("🧹 Cleaning build manifest...");

    let forge = open_read_only(project)?;
    let removed = forge.clean()?;

    println!("✅ Removed {} entries from {}", removed, forge.manifest_path().display());
    println!();
    println!("💡 The next build compiles every unit");
    Ok(())
}
