//! The abstract Store contract the bridge is built against.
//!
//! The Store is an external collaborator — in production it is typically
//! backed by a vector-indexed database with embedding search layered on
//! top. The bridge only ever needs the small, closed surface defined here;
//! [`crate::bridge::sqlite_store::SqliteStore`] is the concrete backend
//! shipped with this crate.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An entry as the bridge sees it. Opaque beyond the fields it relies on:
/// `category`, `summary`, `confidence`, `contentHash` inside `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    pub id: String,
    pub key: String,
    pub content: String,
    pub namespace: String,
    pub tags: Vec<String>,
    pub metadata: Value,
    pub updated_at: DateTime<Utc>,
}

/// Selectors the bridge issues against the Store. Only the fields the
/// bridge actually uses (§6 of the design) are modeled; this is not a
/// general-purpose query language.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub namespace: Option<String>,
    /// Minimum value for a numeric metadata field (`metadata.confidence >= x`).
    pub min_metadata_number: Option<(String, f64)>,
    /// Minimum `updated_at`.
    pub updated_after: Option<DateTime<Utc>>,
    /// Sort descending by this metadata field.
    pub order_by_metadata_desc: Option<String>,
    pub limit: Option<usize>,
}

impl QuerySpec {
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn min_metadata_number(mut self, field: impl Into<String>, value: f64) -> Self {
        self.min_metadata_number = Some((field.into(), value));
        self
    }

    pub fn updated_after(mut self, timestamp: DateTime<Utc>) -> Self {
        self.updated_after = Some(timestamp);
        self
    }

    pub fn order_by_metadata_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by_metadata_desc = Some(field.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A new entry to insert or upsert.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub key: String,
    pub content: String,
    pub namespace: String,
    pub tags: Vec<String>,
    pub metadata: Value,
}

/// The abstract Store capability the bridge depends on.
///
/// Any backend satisfying this trait is pluggable; the bridge performs no
/// dynamic reflection on top of it.
pub trait Store {
    /// Insert or update an entry, keyed by `entry.key`.
    fn store(&self, entry: &NewEntry) -> Result<StoreEntry>;

    /// Insert many entries in one transaction. A single failure aborts the
    /// whole batch — partial progress from *previous* calls is preserved,
    /// but this batch either commits entirely or not at all.
    fn bulk_insert(&self, entries: &[NewEntry]) -> Result<()>;

    /// Run a query against the store.
    fn query(&self, spec: &QuerySpec) -> Result<Vec<StoreEntry>>;

    /// Fetch entries whose `metadata.contentHash` is one of `hashes`.
    fn find_by_content_hashes(&self, hashes: &[String]) -> Result<Vec<StoreEntry>>;

    fn get(&self, id: &str) -> Result<Option<StoreEntry>>;

    fn delete(&self, id: &str) -> Result<bool>;

    fn count(&self) -> Result<usize>;
}
