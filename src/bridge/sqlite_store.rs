//! SQLite-backed implementation of the [`Store`] contract.
//!
//! Mirrors the teacher's `SqliteDatabase` wrapper: a thin owner of a
//! `rusqlite::Connection` with typed helper methods, not an ORM. `tags` and
//! `metadata` are stored as JSON text since the Store's schema (§3) treats
//! them as opaque structured data from the bridge's point of view.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

use super::store::{NewEntry, QuerySpec, Store, StoreEntry};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).context("failed to open Store database")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to create in-memory Store")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entries (
                rowid INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                key TEXT UNIQUE NOT NULL,
                namespace TEXT NOT NULL,
                content TEXT NOT NULL,
                tags TEXT NOT NULL,
                metadata TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .context("failed to initialize Store schema")?;
        Ok(())
    }

    fn row_to_entry(
        id: String,
        key: String,
        namespace: String,
        content: String,
        tags_json: String,
        metadata_json: String,
        updated_at: String,
    ) -> Result<StoreEntry> {
        let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
        let metadata: Value = serde_json::from_str(&metadata_json).unwrap_or(Value::Null);
        let updated_at: DateTime<Utc> = updated_at.parse().context("invalid updated_at in Store row")?;
        Ok(StoreEntry {
            id,
            key,
            content,
            namespace,
            tags,
            metadata,
            updated_at,
        })
    }

    fn upsert_one(conn: &Connection, entry: &NewEntry, now: DateTime<Utc>) -> Result<()> {
        let tags_json = serde_json::to_string(&entry.tags)?;
        let metadata_json = serde_json::to_string(&entry.metadata)?;
        let id = uuid_v4_like(&entry.key);

        conn.execute(
            "INSERT INTO entries (id, key, namespace, content, tags, metadata, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(key) DO UPDATE SET
                content = excluded.content,
                namespace = excluded.namespace,
                tags = excluded.tags,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at",
            params![
                id,
                entry.key,
                entry.namespace,
                entry.content,
                tags_json,
                metadata_json,
                now.to_rfc3339(),
            ],
        )
        .with_context(|| format!("failed to store entry {}", entry.key))?;
        Ok(())
    }

    /// Plain insert, no upsert: used by `bulk_insert` so a conflicting key
    /// fails the whole batch rather than silently overwriting.
    fn insert_one_strict(conn: &Connection, entry: &NewEntry, now: DateTime<Utc>) -> Result<()> {
        let tags_json = serde_json::to_string(&entry.tags)?;
        let metadata_json = serde_json::to_string(&entry.metadata)?;
        let id = uuid_v4_like(&entry.key);

        conn.execute(
            "INSERT INTO entries (id, key, namespace, content, tags, metadata, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                entry.key,
                entry.namespace,
                entry.content,
                tags_json,
                metadata_json,
                now.to_rfc3339(),
            ],
        )
        .with_context(|| format!("failed to insert entry {}", entry.key))?;
        Ok(())
    }
}

/// A key is already unique per the bridge's key scheme; derive a stable id
/// from it rather than pulling in a UUID dependency purely for this.
fn uuid_v4_like(key: &str) -> String {
    format!("id:{key}")
}

impl Store for SqliteStore {
    fn store(&self, entry: &NewEntry) -> Result<StoreEntry> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        Self::upsert_one(&conn, entry, now)?;

        let id = uuid_v4_like(&entry.key);
        Ok(StoreEntry {
            id,
            key: entry.key.clone(),
            content: entry.content.clone(),
            namespace: entry.namespace.clone(),
            tags: entry.tags.clone(),
            metadata: entry.metadata.clone(),
            updated_at: now,
        })
    }

    fn bulk_insert(&self, entries: &[NewEntry]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().context("failed to start bulk_insert transaction")?;
        let now = Utc::now();
        for entry in entries {
            Self::insert_one_strict(&tx, entry, now)?;
        }
        tx.commit().context("failed to commit bulk_insert transaction")?;
        Ok(())
    }

    fn query(&self, spec: &QuerySpec) -> Result<Vec<StoreEntry>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT id, key, namespace, content, tags, metadata, updated_at FROM entries WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(namespace) = &spec.namespace {
            sql.push_str(" AND namespace = ?");
            args.push(Box::new(namespace.clone()));
        }
        if let Some(after) = &spec.updated_after {
            sql.push_str(" AND updated_at >= ?");
            args.push(Box::new(after.to_rfc3339()));
        }
        if let Some((field, min)) = &spec.min_metadata_number {
            sql.push_str(&format!(
                " AND CAST(json_extract(metadata, '$.{field}') AS REAL) >= ?"
            ));
            args.push(Box::new(*min));
        }
        if let Some(field) = &spec.order_by_metadata_desc {
            sql.push_str(&format!(
                " ORDER BY CAST(json_extract(metadata, '$.{field}') AS REAL) DESC"
            ));
        }
        if let Some(limit) = spec.limit {
            sql.push_str(" LIMIT ?");
            args.push(Box::new(limit as i64));
        }

        let mut stmt = conn.prepare(&sql).context("failed to prepare Store query")?;
        let params: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .context("failed to run Store query")?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, key, namespace, content, tags, metadata, updated_at) = row?;
            entries.push(Self::row_to_entry(id, key, namespace, content, tags, metadata, updated_at)?);
        }
        Ok(entries)
    }

    fn find_by_content_hashes(&self, hashes: &[String]) -> Result<Vec<StoreEntry>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = hashes.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, key, namespace, content, tags, metadata, updated_at FROM entries
             WHERE json_extract(metadata, '$.contentHash') IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> = hashes.iter().map(|h| h as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, key, namespace, content, tags, metadata, updated_at) = row?;
            entries.push(Self::row_to_entry(id, key, namespace, content, tags, metadata, updated_at)?);
        }
        Ok(entries)
    }

    fn get(&self, id: &str) -> Result<Option<StoreEntry>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, key, namespace, content, tags, metadata, updated_at FROM entries WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()
            .context("failed to fetch Store entry")?;

        row.map(|(id, key, namespace, content, tags, metadata, updated_at)| {
            Self::row_to_entry(id, key, namespace, content, tags, metadata, updated_at)
        })
        .transpose()
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, namespace: &str, confidence: f64) -> NewEntry {
        NewEntry {
            key: key.to_string(),
            content: format!("content for {key}"),
            namespace: namespace.to_string(),
            tags: vec!["insight".to_string()],
            metadata: json!({"confidence": confidence, "contentHash": format!("hash-{key}")}),
        }
    }

    #[test]
    fn store_then_get_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let inserted = store.store(&entry("a", "learnings", 0.5)).unwrap();
        let fetched = store.get(&inserted.id).unwrap().unwrap();
        assert_eq!(fetched.key, "a");
        assert_eq!(fetched.namespace, "learnings");
    }

    #[test]
    fn store_upserts_on_conflicting_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store(&entry("a", "learnings", 0.5)).unwrap();
        store.store(&entry("a", "learnings", 0.9)).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn bulk_insert_aborts_whole_batch_on_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store(&entry("dup", "learnings", 0.1)).unwrap();

        // bulk_insert uses plain INSERT (not upsert) so a pre-existing key
        // triggers a UNIQUE constraint failure and aborts the transaction.
        let batch = vec![entry("new", "learnings", 0.2), entry("dup", "learnings", 0.3)];
        assert!(store.bulk_insert(&batch).is_err());
        assert!(store.get(&uuid_v4_like("new")).unwrap().is_none());
    }

    #[test]
    fn query_filters_by_namespace_and_confidence() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store(&entry("low", "learnings", 0.2)).unwrap();
        store.store(&entry("high", "learnings", 0.9)).unwrap();
        store.store(&entry("other-ns", "auto-memory", 0.9)).unwrap();

        let results = store
            .query(&QuerySpec::default().namespace("learnings").min_metadata_number("confidence", 0.5))
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "high");
    }

    #[test]
    fn find_by_content_hashes_returns_matches_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store(&entry("a", "auto-memory", 0.5)).unwrap();
        store.store(&entry("b", "auto-memory", 0.5)).unwrap();

        let found = store.find_by_content_hashes(&["hash-a".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "a");
    }

    #[test]
    fn delete_removes_entry() {
        let store = SqliteStore::open_in_memory().unwrap();
        let inserted = store.store(&entry("a", "learnings", 0.5)).unwrap();
        assert!(store.delete(&inserted.id).unwrap());
        assert!(store.get(&inserted.id).unwrap().is_none());
    }
}
