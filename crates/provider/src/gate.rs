//! Execution gate
//!
//! A process-wide set of named locks. Lifecycle operations hold the lock for
//! their key while the user's command runs, so scripts sharing a key never
//! execute concurrently. A key's lock is dropped from the set once no
//! guard holds it and no task is waiting for it.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use shellform_common::GateScope;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

static GLOBAL_GATE: Lazy<Arc<ExecutionGate>> = Lazy::new(|| Arc::new(ExecutionGate::new()));

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Keyed mutual exclusion for command execution
#[derive(Default)]
pub struct ExecutionGate {
    locks: LockMap,
}

/// Held while a command runs; releasing or dropping it unlocks the key
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard {
    key: String,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ExecutionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gate shared by the whole process
    pub fn global() -> Arc<ExecutionGate> {
        GLOBAL_GATE.clone()
    }

    /// Block until `key` is available and take it
    pub async fn acquire(&self, key: &str) -> GateGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        trace!("Waiting for gate {}", key);
        let guard = lock.lock_owned().await;
        trace!("Acquired gate {}", key);

        GateGuard {
            key: key.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently locked or waited on
    pub fn active_keys(&self) -> usize {
        self.locks.lock().len()
    }
}

impl GateGuard {
    /// Release the key
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.guard.take();

        // Waiters hold a clone of the lock, so a count of one means only the map is left
        let mut locks = self.locks.lock();
        if locks
            .get(&self.key)
            .map_or(false, |lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
        trace!("Released gate {}", self.key);
    }
}

/// Gate key for a resource under the given scope
pub fn gate_key(scope: GateScope, type_name: &str, address: &str) -> String {
    match scope {
        GateScope::Kind => type_name.to_string(),
        GateScope::Resource => format!("{}/{}", type_name, address),
    }
}
