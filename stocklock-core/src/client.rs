//! Builds a ready-to-use [`StockService`] from textual backend specs.
//! The CLI and tests construct everything through here.
//!
//! Lock nodes: `memory`, `sqlite:<path>`, `redis://host:port/db`.
//! Counter storage: `memory`, `sqlite:<path>`.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::LockConfig;
use crate::infrastructure::{CounterStore, LockNode};
use crate::infrastructure_in_memory::{InMemoryCounterStore, InMemoryLockNode};
use crate::manager::DistributedLockManager;
use crate::stock::StockService;

#[cfg(feature = "redis")]
const REDIS_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(500);

/// Open a lock manager over `nodes` and a service over `storage`, both on
/// the system clock.
pub fn open_service(config: LockConfig, nodes: &str, storage: &str) -> Result<StockService, String> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let nodes = parse_nodes(nodes, Arc::clone(&clock))?;
    let store = parse_storage(storage, Arc::clone(&clock))?;
    let manager = DistributedLockManager::open(config, nodes, clock).map_err(|e| e.to_string())?;
    Ok(StockService::new(Arc::new(manager), store))
}

/// Parse a comma-separated node list.
pub fn parse_nodes(list: &str, clock: Arc<dyn Clock>) -> Result<Vec<Arc<dyn LockNode>>, String> {
    let nodes = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, spec)| parse_node(spec, i, Arc::clone(&clock)))
        .collect::<Result<Vec<_>, _>>()?;

    if nodes.is_empty() {
        return Err("no lock nodes configured".to_string());
    }
    Ok(nodes)
}

pub fn parse_node(spec: &str, index: usize, clock: Arc<dyn Clock>) -> Result<Arc<dyn LockNode>, String> {
    if spec == "memory" {
        return Ok(Arc::new(InMemoryLockNode::new(format!("memory-{}", index), clock)));
    }

    if let Some(path) = spec.strip_prefix("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            let node = crate::infrastructure_sqlite::SqliteLockNode::open(path, clock)
                .map_err(|e| format!("Failed to open SQLite lock node at '{}': {}", path, e))?;
            return Ok(Arc::new(node));
        }
        #[cfg(not(feature = "sqlite"))]
        {
            let _ = (path, clock);
            return Err("SQLite lock node requested but the `sqlite` feature is not enabled".into());
        }
    }

    if spec.starts_with("redis://") || spec.starts_with("rediss://") {
        #[cfg(feature = "redis")]
        {
            let node = crate::infrastructure_redis::RedisLockNode::new(spec, REDIS_TIMEOUT)
                .map_err(|e| e.to_string())?;
            return Ok(Arc::new(node));
        }
        #[cfg(not(feature = "redis"))]
        {
            return Err("Redis lock node requested but the `redis` feature is not enabled".into());
        }
    }

    Err(format!(
        "Unknown lock node '{}'. Use 'memory', 'sqlite:<path>' or 'redis://...'",
        spec
    ))
}

pub fn parse_storage(spec: &str, clock: Arc<dyn Clock>) -> Result<Box<dyn CounterStore>, String> {
    if spec == "memory" {
        return Ok(Box::new(InMemoryCounterStore::new(clock)));
    }

    if let Some(path) = spec.strip_prefix("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            let store = crate::infrastructure_sqlite::SqliteCounterStore::open(path, clock)
                .map_err(|e| format!("Failed to open SQLite database at '{}': {}", path, e))?;
            return Ok(Box::new(store));
        }
        #[cfg(not(feature = "sqlite"))]
        {
            let _ = (path, clock);
            return Err("SQLite storage requested but the `sqlite` feature is not enabled".into());
        }
    }

    Err(format!(
        "Unknown storage backend: '{}'. Use 'memory' or 'sqlite:<path>'",
        spec
    ))
}
