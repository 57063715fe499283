//! Markdown codec: section parsing, bullet extraction, and insight-line
//! formatting shared by the topic writer and the index curator.

use super::insight::Insight;

/// One `## heading` section of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub content: String,
}

/// Split a document on lines beginning with `## `. Content before the first
/// such heading is ignored; an empty result means no `## ` heading exists.
pub fn parse_markdown_entries(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut heading: Option<&str> = None;
    let mut body_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("## ") {
            if let Some(h) = heading.take() {
                sections.push(Section {
                    heading: h.trim().to_string(),
                    content: body_lines.join("\n").trim().to_string(),
                });
            }
            heading = Some(rest);
            body_lines.clear();
        } else if heading.is_some() {
            body_lines.push(line);
        }
    }

    if let Some(h) = heading {
        sections.push(Section {
            heading: h.trim().to_string(),
            content: body_lines.join("\n").trim().to_string(),
        });
    }

    sections
}

/// Select bullet lines (`- ...`) from `text`, reject `See \`file\`` cross
/// references, and strip the trailing `_(...)_ ` metadata annotation.
pub fn extract_summaries(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("- "))
        .filter(|candidate| !is_cross_reference(candidate))
        .map(strip_metadata_annotation)
        .collect()
}

fn is_cross_reference(bullet_text: &str) -> bool {
    bullet_text
        .strip_prefix("See ")
        .map(|rest| rest.starts_with('`'))
        .unwrap_or(false)
}

/// Remove a trailing ` _(...)_` metadata suffix from a bullet's summary
/// text, leaving a clean statement for the index.
pub fn strip_metadata_annotation(summary: &str) -> String {
    let summary = summary.trim_end();
    if let Some(open) = summary.rfind(" _(") {
        if summary.ends_with(")_") {
            return summary[..open].to_string();
        }
    }
    summary.to_string()
}

/// Render one insight as its topic-file bullet line(s), without a trailing
/// newline.
pub fn format_insight_line(insight: &Insight) -> String {
    let date = insight.recorded_at.format("%Y-%m-%d");
    let mut line = format!(
        "- {} _({}, {}, conf: {:.2})_",
        insight.summary, insight.source, date, insight.confidence
    );

    if let Some(detail) = &insight.detail {
        if detail.contains('\n') {
            for detail_line in detail.lines() {
                line.push('\n');
                line.push_str("  ");
                line.push_str(detail_line);
            }
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::insight::Category;
    use chrono::TimeZone;

    #[test]
    fn parse_markdown_entries_empty_text_is_empty() {
        assert!(parse_markdown_entries("").is_empty());
    }

    #[test]
    fn parse_markdown_entries_ignores_preamble() {
        let text = "# Title\n\nsome prose\n\n## First\nbody a\n\n## Second\nbody b\n";
        let sections = parse_markdown_entries(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "First");
        assert_eq!(sections[0].content, "body a");
        assert_eq!(sections[1].heading, "Second");
        assert_eq!(sections[1].content, "body b");
    }

    #[test]
    fn parse_markdown_entries_no_heading_is_empty() {
        assert!(parse_markdown_entries("just prose\nno headings here\n").is_empty());
    }

    #[test]
    fn extract_summaries_strips_metadata() {
        let text = "- Use prepared statements _(agent:tester, 2026-01-01, conf: 0.90)_\n";
        assert_eq!(
            extract_summaries(text),
            vec!["Use prepared statements".to_string()]
        );
    }

    #[test]
    fn extract_summaries_rejects_cross_references() {
        let text = "- See `debugging.md` for details\n- Real insight here\n";
        assert_eq!(extract_summaries(text), vec!["Real insight here".to_string()]);
    }

    #[test]
    fn strip_metadata_prefix_match_is_not_substring_match() {
        // "Use Int8" must not be treated as contained in a longer bullet.
        let summary = strip_metadata_annotation("Do not use Int8 without scaling");
        assert_eq!(summary, "Do not use Int8 without scaling");
    }

    #[test]
    fn format_insight_line_matches_grammar() {
        let insight = Insight {
            category: Category::Debugging,
            summary: "HNSW index requires initialization before search".to_string(),
            detail: None,
            source: "agent:tester".to_string(),
            confidence: 0.95,
            store_id: None,
            recorded_at: chrono::Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        };
        let line = format_insight_line(&insight);
        assert_eq!(
            line,
            "- HNSW index requires initialization before search _(agent:tester, 2026-03-01, conf: 0.95)_"
        );
    }

    #[test]
    fn format_insight_line_appends_multiline_detail_only() {
        let mut insight = Insight::new(Category::Architecture, "summary", "agent:x");
        insight.recorded_at = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        insight.detail = Some("single line".to_string());
        assert!(!format_insight_line(&insight).contains("single line"));

        insight.detail = Some("line one\nline two".to_string());
        let rendered = format_insight_line(&insight);
        assert!(rendered.contains("\n  line one\n  line two"));
    }

    #[test]
    fn parse_then_format_round_trips_sections() {
        let original = vec![
            Section {
                heading: "Alpha".to_string(),
                content: "one\ntwo".to_string(),
            },
            Section {
                heading: "Beta".to_string(),
                content: "three".to_string(),
            },
        ];

        let mut emitted = String::new();
        for section in &original {
            emitted.push_str("## ");
            emitted.push_str(&section.heading);
            emitted.push('\n');
            emitted.push_str(&section.content);
            emitted.push('\n');
        }

        assert_eq!(parse_markdown_entries(&emitted), original);
    }
}
