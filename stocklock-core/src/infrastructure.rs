use std::sync::Arc;

use crate::error::{NodeError, StoreError};
use crate::types::Counter;

// Both contracts are synchronous and take `&self`: many threads share one
// backend, and each backend makes its own primitives atomic.

/// Defines the contract for one independent lock node.
pub trait LockNode: Send + Sync {
    /// Address or label used in logs
    fn name(&self) -> &str;

    /// Create `resource -> token` with a ttl only if the key is absent.
    /// Returns whether this call created it.
    fn try_set(&self, resource: &str, token: &str, ttl_ms: u64) -> Result<bool, NodeError>;

    /// Delete `resource` only if it still maps to `token`, as one atomic step.
    fn try_delete(&self, resource: &str, token: &str) -> Result<bool, NodeError>;

    /// Reset the ttl of `resource` only if it still maps to `token`.
    fn try_extend(&self, resource: &str, token: &str, ttl_ms: u64) -> Result<bool, NodeError>;

    /// Health check
    fn ping(&self) -> Result<(), NodeError>;

    /// Drop connections. Later calls may fail.
    fn close(&self) {}
}

/// Defines the contract for durable counter storage.
pub trait CounterStore: Send + Sync {
    fn load(&self, id: u64) -> Result<Counter, StoreError>;

    /// Persist `counter` if its `version` is still current; returns the
    /// stored counter with the bumped version.
    fn save(&self, counter: &Counter) -> Result<Counter, StoreError>;

    /// Insert a new counter, assigning the next id. The `id` field is ignored.
    fn insert(&self, counter: Counter) -> Result<Counter, StoreError>;

    /// Remove every counter and reset id assignment.
    fn clear(&self) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<Counter>, StoreError>;
}

// Several services in one process can share a single store.
impl<S: CounterStore + ?Sized> CounterStore for Arc<S> {
    fn load(&self, id: u64) -> Result<Counter, StoreError> {
        (**self).load(id)
    }

    fn save(&self, counter: &Counter) -> Result<Counter, StoreError> {
        (**self).save(counter)
    }

    fn insert(&self, counter: Counter) -> Result<Counter, StoreError> {
        (**self).insert(counter)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }

    fn list(&self) -> Result<Vec<Counter>, StoreError> {
        (**self).list()
    }
}
