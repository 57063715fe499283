use anyhow::Result;
use colored::Colorize;

use super::bootstrap;

pub fn execute() -> Result<()> {
    let bridge = bootstrap()?;
    let result = bridge.sync_to_auto_memory()?;

    println!(
        "{} synced {} insight(s) across {} categor{}",
        "✓".green(),
        result.synced,
        result.categories.len(),
        if result.categories.len() == 1 { "y" } else { "ies" }
    );
    for error in &result.errors {
        println!("  {} {error}", "!".yellow());
    }
    Ok(())
}
