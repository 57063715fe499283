use anyhow::Result;
use colored::Colorize;

use super::bootstrap;

pub fn execute() -> Result<()> {
    let bridge = bootstrap()?;
    let result = bridge.import_from_auto_memory()?;

    println!(
        "{} imported {} entr{}, skipped {} across {} file(s)",
        "✓".green(),
        result.imported,
        if result.imported == 1 { "y" } else { "ies" },
        result.skipped,
        result.files.len()
    );
    for error in &result.errors {
        println!("  {} {error}", "!".yellow());
    }
    Ok(())
}
