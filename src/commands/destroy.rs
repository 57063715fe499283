use anyhow::Result;
use colored::Colorize;

use super::bootstrap;

pub fn execute(purge: bool) -> Result<()> {
    let bridge = bootstrap()?;

    if purge {
        bridge.destroy_and_purge()?;
        println!("{} bridge destroyed, memory directory removed", "✓".green());
    } else {
        bridge.destroy();
        println!("{} bridge destroyed", "✓".green());
    }
    Ok(())
}
