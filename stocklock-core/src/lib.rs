//! # stocklock-core
//!
//! Quorum-based distributed locking (Redlock) over independent lock
//! nodes, and a stock counter whose check-then-decrement runs under that
//! lock so concurrent callers in any process never lose an update.

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "redis")]
#[path = "infrastructure_redis.rs"]
pub mod infrastructure_redis;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod manager;
pub mod quorum;
pub mod stock;
pub mod types;

pub use config::LockConfig;
pub use error::{DeductError, LockError, NodeError, StoreError};
pub use guard::LockGuard;
pub use manager::DistributedLockManager;
pub use stock::StockService;

#[cfg(test)]
mod quorum_test;
#[cfg(test)]
mod config_test;
#[cfg(test)]
#[path = "infrastructure_test.rs"]
mod infrastructure_test;
