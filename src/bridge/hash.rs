//! Content hashing and the bullet-prefix dedup check.
//!
//! The hash is a dedup key, not a MAC: collision resistance matters,
//! authenticity does not.

use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::collections::HashSet;

/// First sixteen hex digits of SHA-256 over `text`.
pub fn hash_content(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

/// True iff `file_content` has a bullet whose text after `- ` starts with
/// `summary` as a prefix (not merely contains it as a substring).
pub fn has_summary_line(file_content: &str, summary: &str) -> bool {
    file_content
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("- "))
        .any(|bullet_text| bullet_text.starts_with(summary))
}

/// Insertion-ordered set of Store keys, bounded at 10,000: the oldest key
/// is evicted once the cap is reached.
#[derive(Debug, Default)]
pub struct SyncedKeys {
    order: VecDeque<String>,
    members: HashSet<String>,
}

const SYNCED_KEYS_CAP: usize = 10_000;

impl SyncedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    pub fn insert(&mut self, key: impl Into<String>) {
        let key = key.into();
        if self.members.contains(&key) {
            return;
        }
        if self.order.len() >= SYNCED_KEYS_CAP {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.members.insert(key);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
