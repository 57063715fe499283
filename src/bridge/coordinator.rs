//! The bridge's public surface: record, sync, import, curate, status, destroy.
//!
//! Owns the buffer/syncedKeys/insightCounter state behind one
//! `parking_lot::Mutex` (the teacher's "simple synchronization" idiom), and
//! the on-disk write phase (topic file appends + index curation) behind a
//! second `write_lock`. Periodic sync runs on a background `std::thread`
//! that goes through the same public methods as any foreground caller, so
//! it takes the same locks and never races a foreground `sync`/`record`/
//! `curate` call.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{BridgeConfig, SyncMode};

use super::classify::classify;
use super::events::{BridgeEvent, EventEmitter};
use super::hash::{hash_content, SyncedKeys};
use super::index::{curate_index as run_curation, PruneStrategy, INDEX_FILENAME};
use super::insight::{clamp_confidence, Category, Insight};
use super::markdown::parse_markdown_entries;
use super::store::{NewEntry, QuerySpec, Store, StoreEntry};
use super::topic::{append_insight, topic_path, TopicMapping};

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub synced: usize,
    pub categories: Vec<String>,
    pub errors: Vec<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub files: Vec<String>,
    pub errors: Vec<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub exists: bool,
    pub memory_dir: PathBuf,
    pub files: Vec<String>,
    pub index_lines: usize,
    pub buffered_insights: usize,
    pub last_sync_time: DateTime<Utc>,
}

struct State {
    buffer: Vec<Insight>,
    synced_keys: SyncedKeys,
    insight_counter: u64,
    last_sync_time: DateTime<Utc>,
    destroyed: bool,
}

struct PeriodicHandle {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

struct Inner {
    memory_dir: PathBuf,
    store: Arc<dyn Store + Send + Sync>,
    topic_mapping: TopicMapping,
    max_index_lines: usize,
    max_topic_file_lines: usize,
    prune_strategy: PruneStrategy,
    min_confidence: f64,
    sync_mode: SyncMode,
    events: Arc<EventEmitter>,
    state: Mutex<State>,
    periodic: Mutex<Option<PeriodicHandle>>,
    /// Serializes the on-disk write phase (topic file appends + index
    /// curation) across `sync_to_auto_memory`, the on-write path of
    /// `record_insight`, and standalone `curate_index` calls, so the
    /// periodic-sync thread and a foreground call never read-modify-write
    /// the same topic file at once.
    write_lock: Mutex<()>,
}

/// Public bridge surface. Cheap to clone — it is a handle onto shared state,
/// the way a Store connection pool handle would be.
#[derive(Clone)]
pub struct BridgeCoordinator(Arc<Inner>);

impl BridgeCoordinator {
    pub fn new(memory_dir: PathBuf, store: Arc<dyn Store + Send + Sync>, config: &BridgeConfig) -> Self {
        let inner = Arc::new(Inner {
            memory_dir,
            store,
            topic_mapping: config.topic_mapping.clone(),
            max_index_lines: config.max_index_lines,
            max_topic_file_lines: config.max_topic_file_lines,
            prune_strategy: config.prune_strategy,
            min_confidence: config.min_confidence,
            sync_mode: config.sync_mode,
            events: Arc::new(EventEmitter::new()),
            state: Mutex::new(State {
                buffer: Vec::new(),
                synced_keys: SyncedKeys::new(),
                insight_counter: 0,
                last_sync_time: epoch(),
                destroyed: false,
            }),
            periodic: Mutex::new(None),
            write_lock: Mutex::new(()),
        });

        if inner.sync_mode == SyncMode::Periodic {
            start_periodic(&inner, config.sync_interval);
        }

        Self(inner)
    }

    pub fn events(&self) -> &Arc<EventEmitter> {
        &self.0.events
    }

    pub fn get_memory_dir(&self) -> &std::path::Path {
        &self.0.memory_dir
    }

    pub fn get_index_path(&self) -> PathBuf {
        self.0.memory_dir.join(INDEX_FILENAME)
    }

    pub fn get_topic_path(&self, category: Category) -> PathBuf {
        topic_path(&self.0.memory_dir, &self.0.topic_mapping, category)
    }

    pub fn record_insight(&self, mut insight: Insight) -> Result<Insight> {
        self.0.ensure_active()?;
        insight.confidence = clamp_confidence(insight.confidence);

        let key = {
            let mut state = self.0.state.lock();
            let counter = state.insight_counter;
            state.insight_counter += 1;
            format!(
                "insight:{}:{}:{}",
                insight.category.as_str(),
                Utc::now().timestamp_millis(),
                counter
            )
        };

        let new_entry = NewEntry {
            key: key.clone(),
            content: insight.summary.clone(),
            namespace: "learnings".to_string(),
            tags: vec!["insight".to_string(), insight.category.as_str().to_string()],
            metadata: json!({
                "category": insight.category.as_str(),
                "summary": insight.summary,
                "confidence": insight.confidence,
                "contentHash": hash_content(&insight.summary),
            }),
        };
        let stored = self.0.store.store(&new_entry).context("failed to store insight")?;
        insight.store_id = Some(stored.id);

        {
            let mut state = self.0.state.lock();
            state.buffer.push(insight.clone());
            state.synced_keys.insert(key);
        }

        self.0.events.emit(&BridgeEvent::InsightRecorded(insight.clone()));

        if self.0.sync_mode == SyncMode::OnWrite {
            let _write_guard = self.0.write_lock.lock();
            append_insight(&self.0.memory_dir, &self.0.topic_mapping, &insight, self.0.max_topic_file_lines)?;
            self.curate_index_locked()?;
        }

        Ok(insight)
    }

    pub fn sync_to_auto_memory(&self) -> Result<SyncResult> {
        self.0.ensure_active()?;
        let start = Instant::now();

        // Held for the whole drain/write cycle: two concurrent syncs (or a
        // sync racing an on-write append) must run one after the other, not
        // interleave their read-modify-write passes over the same topic files.
        let _write_guard = self.0.write_lock.lock();

        if let Err(e) = std::fs::create_dir_all(&self.0.memory_dir) {
            let duration = start.elapsed();
            let error = e.to_string();
            self.0.events.emit(&BridgeEvent::SyncFailed {
                error: error.clone(),
                duration,
            });
            return Ok(SyncResult {
                synced: 0,
                categories: Vec::new(),
                errors: vec![error],
                duration,
            });
        }

        let mut errors = Vec::new();
        let sync_started_at = Utc::now();

        let drained = {
            let mut state = self.0.state.lock();
            std::mem::take(&mut state.buffer)
        };

        let mut combined = drained;
        let last_sync_time = self.0.state.lock().last_sync_time;
        let query = QuerySpec::default()
            .namespace("learnings")
            .min_metadata_number("confidence", self.0.min_confidence)
            .updated_after(last_sync_time)
            .order_by_metadata_desc("confidence")
            .limit(50);

        match self.0.store.query(&query) {
            Ok(entries) => {
                let mut state = self.0.state.lock();
                for entry in entries {
                    if state.synced_keys.contains(&entry.key) {
                        continue;
                    }
                    state.synced_keys.insert(entry.key.clone());
                    combined.push(insight_from_store_entry(&entry));
                }
            }
            Err(e) => errors.push(e.to_string()),
        }

        let mut by_category: HashMap<Category, Vec<Insight>> = HashMap::new();
        for insight in combined {
            by_category.entry(insight.category).or_default().push(insight);
        }

        let mut synced = 0;
        let mut categories: Vec<String> = Vec::new();
        for (category, insights) in &by_category {
            categories.push(category.as_str().to_string());
            for insight in insights {
                match append_insight(&self.0.memory_dir, &self.0.topic_mapping, insight, self.0.max_topic_file_lines) {
                    Ok(true) => synced += 1,
                    Ok(false) => {}
                    Err(e) => errors.push(e.to_string()),
                }
            }
        }
        categories.sort();

        if let Err(e) = self.curate_index_locked() {
            errors.push(e.to_string());
        }

        self.0.state.lock().last_sync_time = sync_started_at;

        let duration = start.elapsed();
        self.0.events.emit(&BridgeEvent::SyncCompleted {
            synced,
            categories: categories.clone(),
            errors: errors.clone(),
            duration,
        });

        Ok(SyncResult {
            synced,
            categories,
            errors,
            duration,
        })
    }

    pub fn import_from_auto_memory(&self) -> Result<ImportResult> {
        self.0.ensure_active()?;
        let start = Instant::now();

        if !self.0.memory_dir.exists() {
            return Ok(ImportResult {
                imported: 0,
                skipped: 0,
                files: Vec::new(),
                errors: Vec::new(),
                duration: start.elapsed(),
            });
        }

        let mut errors = Vec::new();
        let mut files = Vec::new();
        let mut candidates: Vec<NewEntry> = Vec::new();
        let mut candidate_hashes: Vec<String> = Vec::new();

        let mut entries: Vec<_> = std::fs::read_dir(&self.0.memory_dir)
            .with_context(|| format!("failed to read memory directory {}", self.0.memory_dir.display()))?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            files.push(filename.clone());

            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    errors.push(format!("{filename}: {e}"));
                    continue;
                }
            };

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&filename)
                .to_string();

            for section in parse_markdown_entries(&content) {
                let content_hash = hash_content(&section.content);
                let key = format!("auto-memory:{filename}:{}", section.heading);
                candidate_hashes.push(content_hash.clone());
                candidates.push(NewEntry {
                    key,
                    content: section.content,
                    namespace: "auto-memory".to_string(),
                    tags: vec!["auto-memory".to_string(), stem.clone()],
                    metadata: json!({ "contentHash": content_hash, "heading": section.heading }),
                });
            }
        }

        let existing_hashes: HashSet<String> = self
            .0
            .store
            .find_by_content_hashes(&candidate_hashes)
            .unwrap_or_default()
            .iter()
            .filter_map(|e| e.metadata.get("contentHash").and_then(|v| v.as_str()).map(|s| s.to_string()))
            .collect();

        let to_insert: Vec<NewEntry> = candidates
            .into_iter()
            .filter(|c| {
                let hash = c.metadata.get("contentHash").and_then(|v| v.as_str()).unwrap_or_default();
                !existing_hashes.contains(hash)
            })
            .collect();

        let attempted = to_insert.len();
        let mut imported = 0;
        if attempted > 0 {
            match self.0.store.bulk_insert(&to_insert) {
                Ok(()) => imported = attempted,
                Err(e) => errors.push(e.to_string()),
            }
        }
        let skipped = candidate_hashes.len() - attempted;

        let duration = start.elapsed();
        self.0.events.emit(&BridgeEvent::ImportCompleted {
            imported,
            skipped,
            files: files.clone(),
            duration,
        });

        Ok(ImportResult {
            imported,
            skipped,
            files,
            errors,
            duration,
        })
    }

    pub fn curate_index(&self) -> Result<usize> {
        let _write_guard = self.0.write_lock.lock();
        self.curate_index_locked()
    }

    /// Assumes `self.0.write_lock` is already held by the caller.
    fn curate_index_locked(&self) -> Result<usize> {
        let lines = run_curation(
            &self.0.memory_dir,
            &self.0.topic_mapping,
            self.0.max_index_lines,
            self.0.prune_strategy,
        )?;
        self.0.events.emit(&BridgeEvent::IndexCurated { lines });
        Ok(lines)
    }

    pub fn get_status(&self) -> Status {
        let state = self.0.state.lock();
        let buffered_insights = state.buffer.len();
        let last_sync_time = state.last_sync_time;
        drop(state);

        // `exists` tracks whether the directory listing actually succeeded,
        // not a separate stat of the path: a directory that exists but
        // can't be read (e.g. permission denied) must report `exists: false`
        // with an empty file list, not a misleadingly-true `exists`.
        let (exists, files) = match std::fs::read_dir(&self.0.memory_dir) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|name| name.ends_with(".md"))
                    .collect();
                names.sort();
                (true, names)
            }
            Err(_) => (false, Vec::new()),
        };

        let index_lines = std::fs::read_to_string(self.get_index_path())
            .map(|c| c.lines().count())
            .unwrap_or(0);

        Status {
            exists,
            memory_dir: self.0.memory_dir.clone(),
            files,
            index_lines,
            buffered_insights,
            last_sync_time,
        }
    }

    /// Stops the periodic-sync thread (if any) and removes all event
    /// subscribers. Safe to call more than once.
    pub fn destroy(&self) {
        let mut state = self.0.state.lock();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        drop(state);

        self.0.events.clear();
        stop_periodic(&self.0);
    }

    /// `destroy` plus removing the memory directory from disk.
    pub fn destroy_and_purge(&self) -> Result<()> {
        self.destroy();
        if self.0.memory_dir.exists() {
            std::fs::remove_dir_all(&self.0.memory_dir)
                .with_context(|| format!("failed to remove memory directory {}", self.0.memory_dir.display()))?;
        }
        Ok(())
    }
}

impl Inner {
    fn ensure_active(&self) -> Result<()> {
        if self.state.lock().destroyed {
            bail!("bridge has been destroyed");
        }
        Ok(())
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is a valid timestamp")
}

fn insight_from_store_entry(entry: &StoreEntry) -> Insight {
    let category = classify(entry);
    let summary = entry
        .metadata
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or(&entry.content)
        .to_string();
    let confidence = entry.metadata.get("confidence").and_then(|v| v.as_f64()).unwrap_or(1.0);
    let source = entry
        .metadata
        .get("source")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| entry.key.clone());

    Insight {
        category,
        summary,
        detail: None,
        source,
        confidence: clamp_confidence(confidence),
        store_id: Some(entry.id.clone()),
        recorded_at: entry.updated_at,
    }
}

/// Checks the stop flag roughly every 100ms so `destroy` doesn't have to
/// wait out a long sync interval before the thread notices it should exit.
fn start_periodic(inner: &Arc<Inner>, interval: Duration) {
    let stop = Arc::new(AtomicBool::new(false));
    let thread_inner = Arc::clone(inner);
    let thread_stop = Arc::clone(&stop);

    let handle = thread::spawn(move || {
        let tick = Duration::from_millis(100).min(interval);
        let mut elapsed = Duration::ZERO;
        while !thread_stop.load(Ordering::SeqCst) {
            thread::sleep(tick);
            elapsed += tick;
            if thread_stop.load(Ordering::SeqCst) {
                break;
            }
            if elapsed >= interval {
                elapsed = Duration::ZERO;
                let coordinator = BridgeCoordinator(Arc::clone(&thread_inner));
                let _ = coordinator.sync_to_auto_memory();
            }
        }
    });

    *inner.periodic.lock() = Some(PeriodicHandle { stop, handle });
}

fn stop_periodic(inner: &Arc<Inner>) {
    let handle = inner.periodic.lock().take();
    if let Some(PeriodicHandle { stop, handle }) = handle {
        stop.store(true, Ordering::SeqCst);
        let _ = handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::sqlite_store::SqliteStore;
    use tempfile::TempDir;

    fn coordinator(memory_dir: PathBuf, config: BridgeConfig) -> BridgeCoordinator {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        BridgeCoordinator::new(memory_dir, store, &config)
    }

    #[test]
    fn record_insight_on_write_creates_topic_file_and_index() {
        let tmp = TempDir::new().unwrap();
        let config = BridgeConfig {
            sync_mode: SyncMode::OnWrite,
            ..BridgeConfig::default()
        };
        let bridge = coordinator(tmp.path().to_path_buf(), config);

        let insight = Insight::new(Category::Debugging, "Connection pool exhausts under load", "agent:x");
        bridge.record_insight(insight).unwrap();

        let topic = std::fs::read_to_string(bridge.get_topic_path(Category::Debugging)).unwrap();
        assert!(topic.contains("Connection pool exhausts under load"));

        let index = std::fs::read_to_string(bridge.get_index_path()).unwrap();
        assert!(index.contains("## Debugging"));
        assert!(index.contains("Connection pool exhausts under load"));
    }

    #[test]
    fn sync_twice_does_not_duplicate_buffered_insight() {
        let tmp = TempDir::new().unwrap();
        let config = BridgeConfig::default();
        let bridge = coordinator(tmp.path().to_path_buf(), config);

        let insight = Insight::new(Category::Architecture, "Services communicate over gRPC only", "agent:x");
        bridge.record_insight(insight).unwrap();

        bridge.sync_to_auto_memory().unwrap();
        bridge.sync_to_auto_memory().unwrap();

        let topic = std::fs::read_to_string(bridge.get_topic_path(Category::Architecture)).unwrap();
        assert_eq!(topic.matches("Services communicate over gRPC only").count(), 1);
    }

    #[test]
    fn destroy_prevents_further_operations_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let bridge = coordinator(tmp.path().to_path_buf(), BridgeConfig::default());

        bridge.destroy();
        bridge.destroy();

        let insight = Insight::new(Category::Security, "summary", "agent:x");
        assert!(bridge.record_insight(insight).is_err());
        assert!(bridge.sync_to_auto_memory().is_err());
    }

    #[test]
    fn import_from_nonexistent_directory_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let bridge = coordinator(missing, BridgeConfig::default());

        let result = bridge.import_from_auto_memory().unwrap();
        assert_eq!(result.imported, 0);
        assert!(result.files.is_empty());
    }

    #[test]
    fn sync_classifies_store_entries_missing_category_as_project_patterns() {
        let tmp = TempDir::new().unwrap();
        let store: Arc<dyn Store + Send + Sync> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let bridge = BridgeCoordinator::new(tmp.path().to_path_buf(), store.clone(), &BridgeConfig::default());

        let summary = "Retries should use exponential backoff";
        store
            .store(&NewEntry {
                key: "ext:1".to_string(),
                content: summary.to_string(),
                namespace: "learnings".to_string(),
                tags: vec!["insight".to_string()],
                metadata: json!({ "confidence": 1.0, "contentHash": hash_content(summary) }),
            })
            .unwrap();

        bridge.sync_to_auto_memory().unwrap();

        let patterns = std::fs::read_to_string(bridge.get_topic_path(Category::ProjectPatterns)).unwrap();
        assert!(patterns.contains(summary));
    }

    #[test]
    fn sync_continues_past_an_unwritable_topic_file() {
        let tmp = TempDir::new().unwrap();
        let bridge = coordinator(tmp.path().to_path_buf(), BridgeConfig::default());

        // A directory sitting at debugging.md's path forces every write to
        // that topic file to fail, regardless of the running user's
        // permissions — a stand-in for a read-only file on disk.
        std::fs::create_dir_all(bridge.get_topic_path(Category::Debugging)).unwrap();

        bridge
            .record_insight(Insight::new(Category::Debugging, "Should fail to append", "agent:x"))
            .unwrap();
        bridge
            .record_insight(Insight::new(Category::Performance, "Batch writes halve I/O", "agent:x"))
            .unwrap();

        let result = bridge.sync_to_auto_memory().unwrap();
        assert!(!result.errors.is_empty(), "the blocked debugging write must be reported");

        let perf = std::fs::read_to_string(bridge.get_topic_path(Category::Performance)).unwrap();
        assert!(perf.contains("Batch writes halve I/O"));
        assert!(bridge.get_index_path().exists());
    }

    #[test]
    fn concurrent_on_write_records_do_not_lose_each_others_appends() {
        let tmp = TempDir::new().unwrap();
        let config = BridgeConfig {
            sync_mode: SyncMode::OnWrite,
            ..BridgeConfig::default()
        };
        let bridge = coordinator(tmp.path().to_path_buf(), config);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let bridge = bridge.clone();
                thread::spawn(move || {
                    bridge
                        .record_insight(Insight::new(Category::Debugging, format!("Finding {i}"), "agent:x"))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let topic = std::fs::read_to_string(bridge.get_topic_path(Category::Debugging)).unwrap();
        for i in 0..8 {
            assert!(topic.contains(&format!("Finding {i}")), "missing Finding {i} in topic file");
        }
    }

    #[test]
    fn status_reports_buffered_count_before_sync() {
        let tmp = TempDir::new().unwrap();
        let bridge = coordinator(tmp.path().to_path_buf(), BridgeConfig::default());

        bridge.record_insight(Insight::new(Category::Performance, "Batch size 64 halves latency", "agent:x")).unwrap();

        let status = bridge.get_status();
        assert_eq!(status.buffered_insights, 1);
    }
}
