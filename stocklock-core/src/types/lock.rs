use serde::{Deserialize, Serialize};

/// An exclusively held lease on a resource, granted by a quorum of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// The protected resource key
    pub resource: String,
    /// Random value proving ownership on release/extend
    pub fencing_token: String,
    /// Start of the attempt that granted (or last extended) the lease
    pub acquired_at: u64,
    /// Requested time-to-live in milliseconds
    pub ttl: u64,
    /// Drift-adjusted instant after which the lease must be treated as lost
    pub expires_at: u64,
}

impl Lock {
    pub fn new(
        resource: impl Into<String>,
        fencing_token: impl Into<String>,
        acquired_at: u64,
        ttl: u64,
        validity: u64,
    ) -> Self {
        Self {
            resource: resource.into(),
            fencing_token: fencing_token.into(),
            acquired_at,
            ttl,
            expires_at: acquired_at + validity,
        }
    }

    pub fn is_valid(&self, now: u64) -> bool {
        now < self.expires_at
    }

    /// Milliseconds left before `expires_at`, zero once expired.
    pub fn remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}

/// Per-node tally of a release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseReport {
    /// Nodes that deleted the key
    pub released: usize,
    /// Nodes where the key was gone or held by another token
    pub mismatched: usize,
    /// Nodes that could not be reached
    pub unreachable: usize,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0 && self.unreachable == 0
    }
}

/// Health of a single lock node as seen by `ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHealth {
    pub node: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counters describing what a lock manager has done since it was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStats {
    /// Locks handed to callers
    pub acquired: u64,
    /// Calls to `release`
    pub released: u64,
    /// Successful extensions
    pub extended: u64,
    /// Individual attempts that missed quorum or validity
    pub failed_attempts: u64,
    /// Acquisitions that gave up after the retry budget
    pub exhausted: u64,
}
