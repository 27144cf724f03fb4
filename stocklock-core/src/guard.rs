use crate::error::LockError;
use crate::manager::DistributedLockManager;
use crate::types::{Lock, ReleaseReport};

/// A held lock that is released exactly once: explicitly through
/// [`LockGuard::release`], or on drop.
pub struct LockGuard<'a> {
    manager: &'a DistributedLockManager,
    lock: Lock,
    released: bool,
}

impl<'a> LockGuard<'a> {
    pub(crate) fn new(manager: &'a DistributedLockManager, lock: Lock) -> Self {
        Self {
            manager,
            lock,
            released: false,
        }
    }

    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    pub fn remaining_ms(&self) -> u64 {
        self.lock.remaining_ms(self.manager.clock().now_ms())
    }

    pub fn is_valid(&self) -> bool {
        self.lock.is_valid(self.manager.clock().now_ms())
    }

    /// Push the expiry out by `ttl_ms`. On failure the old lease is kept
    /// and still released on drop.
    pub fn extend(&mut self, ttl_ms: u64) -> Result<(), LockError> {
        self.lock = self.manager.extend(&self.lock, ttl_ms)?;
        Ok(())
    }

    pub fn release(mut self) -> ReleaseReport {
        self.released = true;
        self.manager.release(&self.lock)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            self.manager.release(&self.lock);
        }
    }
}
