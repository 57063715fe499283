//! The Auto-Memory Bridge: keeps the Store and the memory directory consistent.

pub mod classify;
pub mod coordinator;
pub mod events;
pub mod hash;
pub mod index;
pub mod insight;
pub mod markdown;
pub mod sqlite_store;
pub mod store;
pub mod topic;

pub use coordinator::{BridgeCoordinator, ImportResult, Status, SyncResult};
pub use events::{BridgeEvent, EventEmitter};
pub use insight::{Category, Insight};
pub use sqlite_store::SqliteStore;
pub use store::{NewEntry, QuerySpec, Store, StoreEntry};
