//! Builds `MEMORY.md` from the topic files, pruning to a hard line budget.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::markdown::{extract_summaries, strip_metadata_annotation};
use super::topic::TopicMapping;

pub const INDEX_FILENAME: &str = "MEMORY.md";
pub const INDEX_TITLE: &str = "# Claude Flow V3 Project Memory";

/// How to choose which bullets to drop when the index would exceed its
/// line budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PruneStrategy {
    #[default]
    Fifo,
    Lru,
    ConfidenceWeighted,
}

struct Group {
    /// The `## ` heading this group renders under: the category's fixed
    /// label when `topicMapping` recognizes the file, or the filename stem
    /// otherwise, so an unrecognized topic file still gets its own section
    /// instead of being folded into an unrelated one.
    label: String,
    bullets: Vec<String>,
}

/// Read every topic file (everything under `memory_dir` matching `*.md`
/// except `MEMORY.md`), group their bullets by category, prune to fit
/// `max_lines`, and write the result to `MEMORY.md`. Returns the number of
/// lines written.
pub fn curate_index(
    memory_dir: &Path,
    mapping: &TopicMapping,
    max_lines: usize,
    prune_strategy: PruneStrategy,
) -> Result<usize> {
    std::fs::create_dir_all(memory_dir)
        .with_context(|| format!("failed to create memory directory {}", memory_dir.display()))?;

    let mut groups = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(memory_dir)
        .with_context(|| format!("failed to read memory directory {}", memory_dir.display()))?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if filename == INDEX_FILENAME {
            continue;
        }

        // An unreadable topic file (permission denied, or — as in a failed
        // prior sync — a directory sitting where a file should be) must not
        // block the rest of the index from being curated.
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => continue,
        };

        let bullets = bullets_from_topic_file(&content);
        if bullets.is_empty() {
            continue;
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
        let label = match mapping.category_for_filename(filename) {
            Some(category) => category.label().to_string(),
            None => stem.to_string(),
        };

        groups.push(Group { label, bullets });
    }

    prune_groups_to_fit(&mut groups, max_lines, prune_strategy);

    let rendered = render_index(&groups);
    std::fs::write(memory_dir.join(INDEX_FILENAME), &rendered)
        .with_context(|| format!("failed to write {}", INDEX_FILENAME))?;

    Ok(rendered.lines().count())
}

/// A topic file's bullets, in file order, with metadata stripped. The file
/// content has no `## ` heading of its own (that's the index's doing), so
/// this reads bullets directly rather than going through section parsing.
fn bullets_from_topic_file(content: &str) -> Vec<String> {
    extract_summaries(content)
        .into_iter()
        .map(|s| strip_metadata_annotation(&s))
        .collect()
}

fn render_index(groups: &[Group]) -> String {
    let mut out = String::new();
    out.push_str(INDEX_TITLE);
    out.push('\n');
    out.push('\n');

    for group in groups {
        if group.bullets.is_empty() {
            continue;
        }
        out.push_str("## ");
        out.push_str(&group.label);
        out.push('\n');
        out.push('\n');
        for bullet in &group.bullets {
            out.push_str("- ");
            out.push_str(bullet);
            out.push('\n');
        }
        out.push('\n');
    }

    // Collapse a trailing blank line into a single terminating newline.
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

/// Drop bullets until the projected rendering fits `max_lines`, tracking a
/// running line count (O(n): one pass, no rebuild-and-measure loop).
/// `fifo`/`lru` drop the oldest bullet in a section first; `confidence-weighted`
/// degrades to fifo here because confidence is no longer available once
/// metadata has been stripped from the bullet text (see DESIGN.md).
fn prune_groups_to_fit(groups: &mut Vec<Group>, max_lines: usize, _strategy: PruneStrategy) {
    let mut total = projected_line_count(groups);
    if total <= max_lines {
        return;
    }

    let mut group_idx = 0;
    while total > max_lines && group_idx < groups.len() {
        if groups[group_idx].bullets.is_empty() {
            group_idx += 1;
            continue;
        }
        groups[group_idx].bullets.remove(0);
        total -= 1;
        if groups[group_idx].bullets.is_empty() {
            // Removing the section header + its two blank-line separators
            // only happens once, when the group empties out.
            total -= 3;
            group_idx += 1;
        }
    }

    groups.retain(|g| !g.bullets.is_empty());
}

fn projected_line_count(groups: &[Group]) -> usize {
    // title + blank
    let mut total = 2;
    for group in groups {
        if group.bullets.is_empty() {
            continue;
        }
        // "## Label" + blank + bullets + trailing blank
        total += 2 + group.bullets.len() + 1;
    }
    total
}
