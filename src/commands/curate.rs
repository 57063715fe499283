use anyhow::Result;
use colored::Colorize;

use super::bootstrap;

pub fn execute() -> Result<()> {
    let bridge = bootstrap()?;
    let lines = bridge.curate_index()?;
    println!("{} MEMORY.md regenerated ({lines} lines)", "✓".green());
    Ok(())
}
