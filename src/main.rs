use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use memory_bridge::bridge::Category;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Bidirectional bridge between a memory store and a markdown memory directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new insight
    Record {
        /// Category: project-patterns, debugging, architecture, preferences, performance, security, swarm-results
        #[arg(long)]
        category: String,

        /// One-line summary; the dedup identity
        #[arg(long)]
        summary: String,

        /// Optional multi-line elaboration
        #[arg(long)]
        detail: Option<String>,

        /// Provenance string, e.g. agent:tester
        #[arg(long, default_value = "cli")]
        source: String,

        /// Confidence in [0,1]
        #[arg(long, default_value = "1.0")]
        confidence: f64,
    },

    /// Flush buffered insights and Store entries to the memory directory
    Sync,

    /// Import the memory directory's existing content into the Store
    Import,

    /// Regenerate MEMORY.md from the topic files
    Curate,

    /// Show the bridge's current status
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Tear down the bridge
    Destroy {
        /// Also remove the memory directory from disk
        #[arg(long)]
        purge: bool,
    },
}

fn main() -> Result<()> {
    if std::env::var("CLAUDE_CODE_DISABLE_AUTO_MEMORY").as_deref() == Ok("1") {
        println!("Auto-memory bridge disabled via CLAUDE_CODE_DISABLE_AUTO_MEMORY");
        return Ok(());
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            category,
            summary,
            detail,
            source,
            confidence,
        } => {
            let category = Category::from_str_loose(&category)
                .ok_or_else(|| anyhow::anyhow!("unknown category '{category}'"))?;
            commands::record::execute(category, summary, detail, source, confidence)?;
        }
        Commands::Sync => commands::sync::execute()?,
        Commands::Import => commands::import::execute()?,
        Commands::Curate => commands::curate::execute()?,
        Commands::Status { json } => commands::status::execute(json)?,
        Commands::Destroy { purge } => commands::destroy::execute(purge)?,
    }

    Ok(())
}
