use anyhow::Result;
use colored::Colorize;

use super::bootstrap;

pub fn execute(json: bool) -> Result<()> {
    let bridge = bootstrap()?;
    let status = bridge.get_status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "memory dir:  {} ({})",
        status.memory_dir.display(),
        if status.exists { "exists".green() } else { "missing".red() }
    );
    println!("topic files: {}", status.files.len());
    println!("index lines: {}", status.index_lines);
    println!("buffered:    {}", status.buffered_insights);
    println!("last sync:   {}", status.last_sync_time);
    Ok(())
}
