//! Map an opaque Store entry to one of the closed-set categories.

use super::insight::Category;
use super::store::StoreEntry;

/// 1. Trust `metadata.category` if it is one of the closed set.
/// 2. Else walk `tags` looking for a direct match or a known alias.
/// 3. Else fall back to the default bucket.
pub fn classify(entry: &StoreEntry) -> Category {
    if let Some(category) = entry
        .metadata
        .get("category")
        .and_then(|v| v.as_str())
        .and_then(Category::from_str_loose)
    {
        return category;
    }

    for tag in &entry.tags {
        if let Some(category) = Category::from_str_loose(tag) {
            return category;
        }
        if let Some(category) = alias(tag) {
            return category;
        }
    }

    Category::ProjectPatterns
}

fn alias(tag: &str) -> Option<Category> {
    match tag {
        "bug" => Some(Category::Debugging),
        "swarm" | "agent" => Some(Category::SwarmResults),
        "perf" | "benchmark" => Some(Category::Performance),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(tags: &[&str], metadata: serde_json::Value) -> StoreEntry {
        StoreEntry {
            id: "1".to_string(),
            key: "k".to_string(),
            content: "content".to_string(),
            namespace: "learnings".to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            metadata,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn classify_prefers_explicit_metadata_category() {
        let e = entry(&["agent"], json!({"category": "security"}));
        assert_eq!(classify(&e), Category::Security);
    }

    #[test]
    fn classify_falls_back_to_tags() {
        let e = entry(&["bug"], json!({}));
        assert_eq!(classify(&e), Category::Debugging);
    }

    #[test]
    fn classify_uses_tag_aliases() {
        assert_eq!(classify(&entry(&["swarm"], json!({}))), Category::SwarmResults);
        assert_eq!(classify(&entry(&["agent"], json!({}))), Category::SwarmResults);
        assert_eq!(classify(&entry(&["perf"], json!({}))), Category::Performance);
        assert_eq!(
            classify(&entry(&["benchmark"], json!({}))),
            Category::Performance
        );
    }

    #[test]
    fn classify_defaults_to_project_patterns() {
        let e = entry(&["insight"], json!({}));
        assert_eq!(classify(&e), Category::ProjectPatterns);
    }
}
