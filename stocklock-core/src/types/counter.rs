use serde::{Deserialize, Serialize};

/// A product whose stock is the contested counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: u64,
    pub name: String,
    /// Remaining stock
    pub value: u64,
    /// Bumped by every save; a save against an older version is stale
    pub version: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Counter {
    pub fn new(id: u64, name: impl Into<String>, value: u64, now: u64) -> Self {
        Self {
            id,
            name: name.into(),
            value,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lock resource key guarding this counter.
    pub fn resource_key(id: u64) -> String {
        format!("lock:product:{}", id)
    }
}
