//! Error types, one enum per layer.
//!
//! Node errors never leave the lock manager; they only reduce the grant
//! count. Lock errors surface to the critical section, which folds them
//! into [`DeductError`] together with store and business-rule failures.

use thiserror::Error;

/// Failure talking to a single lock node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("node {0} unreachable")]
    Unreachable(String),

    #[error("node {0} timed out")]
    Timeout(String),

    #[error("node backend error: {0}")]
    Backend(String),
}

/// Manager-level lock outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Fewer than quorum nodes granted the lease
    #[error("quorum not reached for {resource}: {granted}/{quorum} nodes granted")]
    QuorumNotReached {
        resource: String,
        granted: usize,
        quorum: usize,
    },

    /// Quorum granted, but the drift-adjusted validity left nothing usable
    #[error("lease on {resource} too short after drift compensation ({validity_ms}ms)")]
    LeaseTooShort { resource: String, validity_ms: i64 },

    /// Retry budget exhausted
    #[error("lock on {resource} unavailable after {attempts} attempts: {last}")]
    Unavailable {
        resource: String,
        attempts: u32,
        last: Box<LockError>,
    },

    #[error("lock manager is closed")]
    Closed,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Counter store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("counter {0} not found")]
    NotFound(u64),

    /// Someone saved the counter since it was loaded
    #[error("stale write on counter {id}: expected version {expected}")]
    StaleWrite { id: u64, expected: u64 },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Outcomes of a guarded stock deduction other than success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeductError {
    #[error("quantity must be greater than 0")]
    InvalidQuantity,

    #[error("lock unavailable: {0}")]
    LockUnavailable(LockError),

    #[error("product {0} not found")]
    NotFound(u64),

    #[error("insufficient stock for product {id}: {available} available, {requested} requested")]
    InsufficientStock {
        id: u64,
        available: u64,
        requested: u64,
    },

    /// The lease ran out before the write and could not be extended
    #[error("lease on {0} expired inside the critical section")]
    LeaseExpired(String),

    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for DeductError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => DeductError::NotFound(id),
            other => DeductError::Persistence(other),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for NodeError {
    fn from(err: rusqlite::Error) -> Self {
        NodeError::Backend(format!("SQLite error: {}", err))
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(format!("SQLite error: {}", err))
    }
}
