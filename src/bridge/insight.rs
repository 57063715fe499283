//! The unit of knowledge flowing through the bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of topic labels used for classification, file naming,
/// and index grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ProjectPatterns,
    Debugging,
    Architecture,
    Preferences,
    Performance,
    Security,
    SwarmResults,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::ProjectPatterns,
        Category::Debugging,
        Category::Architecture,
        Category::Preferences,
        Category::Performance,
        Category::Security,
        Category::SwarmResults,
    ];

    /// The `category → filename` default, e.g. `debugging` → `debugging.md`.
    pub fn default_filename(self) -> &'static str {
        match self {
            Category::ProjectPatterns => "patterns.md",
            Category::Debugging => "debugging.md",
            Category::Architecture => "architecture.md",
            Category::Preferences => "preferences.md",
            Category::Performance => "performance.md",
            Category::Security => "security.md",
            Category::SwarmResults => "swarm-results.md",
        }
    }

    /// The fixed `## <Label>` header used in both topic files and the index.
    pub fn label(self) -> &'static str {
        match self {
            Category::ProjectPatterns => "Project Patterns",
            Category::Debugging => "Debugging",
            Category::Architecture => "Architecture",
            Category::Preferences => "Preferences",
            Category::Performance => "Performance",
            Category::Security => "Security",
            Category::SwarmResults => "Swarm Results",
        }
    }

    /// The wire/tag spelling, e.g. `project-patterns`.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::ProjectPatterns => "project-patterns",
            Category::Debugging => "debugging",
            Category::Architecture => "architecture",
            Category::Preferences => "preferences",
            Category::Performance => "performance",
            Category::Security => "security",
            Category::SwarmResults => "swarm-results",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of knowledge produced by the surrounding system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub category: Category,
    pub summary: String,
    pub detail: Option<String>,
    pub source: String,
    pub confidence: f64,
    pub store_id: Option<String>,
    /// When the insight was recorded; used for the `(source, date, conf)`
    /// metadata suffix. Defaults to now when not supplied by a caller.
    pub recorded_at: DateTime<Utc>,
}

impl Insight {
    pub fn new(category: Category, summary: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            category,
            summary: summary.into(),
            detail: None,
            source: source.into(),
            confidence: 1.0,
            store_id: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    pub fn with_store_id(mut self, store_id: impl Into<String>) -> Self {
        self.store_id = Some(store_id.into());
        self
    }
}

/// Confidence outside [0,1] is clamped rather than rejected.
pub fn clamp_confidence(confidence: f64) -> f64 {
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped_both_directions() {
        assert_eq!(clamp_confidence(1.5), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
    }

    #[test]
    fn category_round_trips_through_as_str() {
        for category in Category::ALL {
            assert_eq!(Category::from_str_loose(category.as_str()), Some(category));
        }
    }

    #[test]
    fn unknown_category_string_is_none() {
        assert_eq!(Category::from_str_loose("not-a-category"), None);
    }
}
