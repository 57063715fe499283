//! The event stream exposed to callers: a minimal, bespoke emitter rather
//! than a generic pub/sub abstraction — the bridge only ever has five
//! event names and no cross-process delivery to worry about.

use parking_lot::Mutex;
use std::time::Duration;

use super::insight::Insight;

#[derive(Debug, Clone)]
pub enum BridgeEvent {
    InsightRecorded(Insight),
    SyncCompleted {
        synced: usize,
        categories: Vec<String>,
        errors: Vec<String>,
        duration: Duration,
    },
    SyncFailed {
        error: String,
        duration: Duration,
    },
    ImportCompleted {
        imported: usize,
        skipped: usize,
        files: Vec<String>,
        duration: Duration,
    },
    IndexCurated {
        lines: usize,
    },
}

impl BridgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::InsightRecorded(_) => "insight:recorded",
            BridgeEvent::SyncCompleted { .. } => "sync:completed",
            BridgeEvent::SyncFailed { .. } => "sync:failed",
            BridgeEvent::ImportCompleted { .. } => "import:completed",
            BridgeEvent::IndexCurated { .. } => "index:curated",
        }
    }
}

type Listener = Box<dyn Fn(&BridgeEvent) + Send>;

/// Subscribe-by-name event emitter. `subscribe` returns a token `off` can
/// later use to remove that one listener; `clear` removes every listener
/// at once (what `destroy` calls).
#[derive(Default)]
pub struct EventEmitter {
    listeners: Mutex<Vec<(u64, &'static str, Listener)>>,
    next_id: Mutex<u64>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        }
    }

    pub fn on(&self, event_name: &'static str, listener: Listener) -> u64 {
        let mut next_id = self.next_id.lock();
        let id = *next_id;
        *next_id += 1;
        self.listeners.lock().push((id, event_name, listener));
        id
    }

    pub fn off(&self, id: u64) {
        self.listeners.lock().retain(|(listener_id, _, _)| *listener_id != id);
    }

    pub fn emit(&self, event: &BridgeEvent) {
        let listeners = self.listeners.lock();
        for (_, name, listener) in listeners.iter() {
            if *name == event.name() {
                listener(event);
            }
        }
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}
