use anyhow::Result;
use colored::Colorize;
use memory_bridge::bridge::{Category, Insight};

use super::bootstrap;

pub fn execute(category: Category, summary: String, detail: Option<String>, source: String, confidence: f64) -> Result<()> {
    let bridge = bootstrap()?;

    let mut insight = Insight::new(category, summary, source).with_confidence(confidence);
    if let Some(detail) = detail {
        insight = insight.with_detail(detail);
    }

    let recorded = bridge.record_insight(insight)?;
    println!(
        "{} recorded under {}",
        "✓".green(),
        recorded.category.to_string().bold()
    );
    Ok(())
}
