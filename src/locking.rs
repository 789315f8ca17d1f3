//! Process-wide named-lock registry.
//!
//! Serializes mount/unmount decisions per `(volume type, volume name)`
//! pair. The first caller to use a name creates the underlying mutex;
//! later callers for the same name contend on it, while distinct names
//! never contend. When the last holder releases and no waiter remains,
//! the name's entry is removed from the table, so the registry only ever
//! holds names in active use. There is no fairness guarantee and no
//! timeout: a caller blocks until the named lock is free.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use parking_lot::lock_api::ArcMutexGuard;

static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Mutex<()>>>>> = OnceLock::new();

/// Guard holding one named lock. The lock is released when dropped.
pub struct NamedLockGuard {
    name: String,
    _guard: ArcMutexGuard<parking_lot::RawMutex, ()>,
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        // The table holds one reference and our guard holds another; any
        // additional reference belongs to a holder or waiter still using
        // the name, in which case the entry must stay.
        if let Some(registry) = REGISTRY.get() {
            let mut table = registry.lock();
            if let Some(entry) = table.get(&self.name) {
                if Arc::strong_count(entry) == 2 {
                    table.remove(&self.name);
                }
            }
        }
        tracing::trace!(lock = %self.name, "Released named lock");
    }
}

/// Acquire the process-wide lock for `name`, blocking until it is free.
pub fn lock(name: &str) -> NamedLockGuard {
    let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));

    // Registration and acquisition are separate critical sections so a held
    // named lock never blocks registration of unrelated names.
    let entry = {
        let mut table = registry.lock();
        table
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    };

    let guard = entry.lock_arc();
    tracing::trace!(lock = %name, "Acquired named lock");

    NamedLockGuard {
        name: name.to_string(),
        _guard: guard,
    }
}
