use crate::clock::Clock;
use crate::error::{NodeError, StoreError};
use crate::infrastructure::{CounterStore, LockNode};
use crate::types::Counter;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Entry {
    token: String,
    expires_at: u64,
}

/// A simulated lock node. The mutex stands in for the node's own
/// single-threaded command execution; expiry follows the node's clock.
pub struct InMemoryLockNode {
    name: String,
    clock: Arc<dyn Clock>,
    // Map of resource -> (token, expiry)
    keys: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
}

impl InMemoryLockNode {
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            clock,
            keys: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Current live token for `resource`, if any.
    pub fn holder(&self, resource: &str) -> Option<String> {
        let now = self.clock.now_ms();
        self.keys
            .lock()
            .get(resource)
            .filter(|e| e.expires_at > now)
            .map(|e| e.token.clone())
    }

    /// Number of unexpired keys.
    pub fn live_keys(&self) -> usize {
        let now = self.clock.now_ms();
        self.keys.lock().values().filter(|e| e.expires_at > now).count()
    }

    fn check_available(&self) -> Result<(), NodeError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NodeError::Unreachable(self.name.clone()))
        }
    }
}

impl LockNode for InMemoryLockNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_set(&self, resource: &str, token: &str, ttl_ms: u64) -> Result<bool, NodeError> {
        self.check_available()?;
        let now = self.clock.now_ms();
        let mut keys = self.keys.lock();

        if let Some(existing) = keys.get(resource) {
            if existing.expires_at > now {
                return Ok(false);
            }
        }

        keys.insert(
            resource.to_string(),
            Entry {
                token: token.to_string(),
                expires_at: now + ttl_ms,
            },
        );
        Ok(true)
    }

    fn try_delete(&self, resource: &str, token: &str) -> Result<bool, NodeError> {
        self.check_available()?;
        let now = self.clock.now_ms();
        let mut keys = self.keys.lock();

        match keys.get(resource) {
            Some(entry) if entry.expires_at <= now => {
                // Expired keys are gone as far as callers can tell
                keys.remove(resource);
                Ok(false)
            }
            Some(entry) if entry.token == token => {
                keys.remove(resource);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn try_extend(&self, resource: &str, token: &str, ttl_ms: u64) -> Result<bool, NodeError> {
        self.check_available()?;
        let now = self.clock.now_ms();
        let mut keys = self.keys.lock();

        if let Some(entry) = keys.get_mut(resource) {
            if entry.token == token && entry.expires_at > now {
                entry.expires_at = now + ttl_ms;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn ping(&self) -> Result<(), NodeError> {
        self.check_available()
    }
}

struct Products {
    rows: BTreeMap<u64, Counter>,
    next_id: u64,
}

/// Counter store kept in process memory.
pub struct InMemoryCounterStore {
    clock: Arc<dyn Clock>,
    products: Mutex<Products>,
}

impl InMemoryCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            products: Mutex::new(Products {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl CounterStore for InMemoryCounterStore {
    fn load(&self, id: u64) -> Result<Counter, StoreError> {
        self.products
            .lock()
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn save(&self, counter: &Counter) -> Result<Counter, StoreError> {
        let mut products = self.products.lock();
        let stored = products
            .rows
            .get_mut(&counter.id)
            .ok_or(StoreError::NotFound(counter.id))?;

        if stored.version != counter.version {
            return Err(StoreError::StaleWrite {
                id: counter.id,
                expected: counter.version,
            });
        }

        stored.name = counter.name.clone();
        stored.value = counter.value;
        stored.version += 1;
        stored.updated_at = self.clock.now_ms();
        Ok(stored.clone())
    }

    fn insert(&self, mut counter: Counter) -> Result<Counter, StoreError> {
        let mut products = self.products.lock();
        counter.id = products.next_id;
        products.next_id += 1;
        products.rows.insert(counter.id, counter.clone());
        Ok(counter)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut products = self.products.lock();
        products.rows.clear();
        products.next_id = 1;
        Ok(())
    }

    fn list(&self) -> Result<Vec<Counter>, StoreError> {
        Ok(self.products.lock().rows.values().cloned().collect())
    }
}
