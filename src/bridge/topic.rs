//! Appends insights to per-category topic files and keeps them within
//! their line budget.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::hash::has_summary_line;
use super::insight::{Category, Insight};
use super::markdown::format_insight_line;

/// `category → filename`, defaulting to [`Category::default_filename`] but
/// overridable via [`crate::config::BridgeConfig`].
#[derive(Debug, Clone, Default)]
pub struct TopicMapping(HashMap<Category, String>);

impl TopicMapping {
    pub fn with_overrides(overrides: HashMap<Category, String>) -> Self {
        Self(overrides)
    }

    pub fn filename(&self, category: Category) -> String {
        self.0
            .get(&category)
            .cloned()
            .unwrap_or_else(|| category.default_filename().to_string())
    }

    /// Reverse lookup used by the index curator: given a topic file's stem
    /// (e.g. `debugging` from `debugging.md`), find the category it was
    /// written under.
    pub fn category_for_filename(&self, filename: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|&category| self.filename(category) == filename)
    }
}

/// Append `insight` to its topic file under `memory_dir`, creating the
/// file (with header) if it doesn't exist, and pruning it if it grows
/// past `max_lines`. Returns `Ok(false)` without writing if the summary is
/// already present (dedup).
pub fn append_insight(
    memory_dir: &Path,
    mapping: &TopicMapping,
    insight: &Insight,
    max_lines: usize,
) -> Result<bool> {
    std::fs::create_dir_all(memory_dir)
        .with_context(|| format!("failed to create memory directory {}", memory_dir.display()))?;

    let path = topic_path(memory_dir, mapping, insight.category);
    let existing = if path.exists() {
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read topic file {}", path.display()))?
    } else {
        format!("# {}\n\n", insight.category.label())
    };

    if has_summary_line(&existing, &insight.summary) {
        return Ok(false);
    }

    let mut updated = existing;
    if !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format_insight_line(insight));
    updated.push('\n');

    if line_count(&updated) > max_lines {
        updated = prune_topic_file(&updated, max_lines);
    }

    std::fs::write(&path, updated)
        .with_context(|| format!("failed to write topic file {}", path.display()))?;
    Ok(true)
}

pub fn topic_path(memory_dir: &Path, mapping: &TopicMapping, category: Category) -> PathBuf {
    memory_dir.join(mapping.filename(category))
}

fn line_count(text: &str) -> usize {
    text.lines().count()
}

/// Preserve the header block verbatim; drop the oldest bullets beneath it
/// until the total line count is `<= max_lines`. Prose between the header
/// and the first bullet is never discarded.
pub fn prune_topic_file(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= max_lines {
        return content.to_string();
    }

    let header_end = header_block_end(&lines);
    let (header, rest) = lines.split_at(header_end);

    // Group the remaining lines into bullets (a `- ` line plus any
    // following continuation lines), preserving order.
    let mut bullets: Vec<Vec<&str>> = Vec::new();
    for line in rest {
        if line.starts_with("- ") || bullets.is_empty() {
            bullets.push(vec![line]);
        } else {
            bullets.last_mut().unwrap().push(line);
        }
    }

    let mut total = header.len() + bullets.iter().map(Vec::len).sum::<usize>();
    let mut start = 0;
    while total > max_lines && start < bullets.len() {
        total -= bullets[start].len();
        start += 1;
    }

    let mut result: Vec<&str> = header.to_vec();
    for bullet in &bullets[start..] {
        result.extend(bullet.iter());
    }

    let mut rendered = result.join("\n");
    rendered.push('\n');
    rendered
}

/// Everything up to the first bullet line is the preserved prefix: the
/// `# ` header, any blank line immediately after it, and any prose lines
/// in between. None of it is ever pruned, regardless of budget.
fn header_block_end(lines: &[&str]) -> usize {
    lines
        .iter()
        .position(|line| line.starts_with("- "))
        .unwrap_or(lines.len())
}
