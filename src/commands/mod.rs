//! Thin CLI wrappers: resolve paths and config, construct a bridge, call
//! straight into the coordinator, print the result.

pub mod curate;
pub mod destroy;
pub mod import;
pub mod record;
pub mod status;
pub mod sync;

use anyhow::Result;
use memory_bridge::bridge::{BridgeCoordinator, SqliteStore, Store};
use memory_bridge::config::BridgeConfig;
use memory_bridge::paths;
use std::sync::Arc;

/// Resolve the current working directory into a running bridge: the memory
/// directory, the project-local config, and the SQLite Store that backs it.
pub fn bootstrap() -> Result<BridgeCoordinator> {
    let cwd = std::env::current_dir()?;
    let project_root = paths::project_root(&cwd);
    let memory_dir = paths::resolve_memory_dir(&cwd);
    let config = BridgeConfig::load(&project_root)?;
    let store: Arc<dyn Store + Send + Sync> = Arc::new(SqliteStore::open(paths::project::store_db_path(&project_root))?);
    Ok(BridgeCoordinator::new(memory_dir, store, &config))
}
