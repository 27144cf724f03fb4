//! Quorum lock manager over N independent nodes (Redlock).
//!
//! A lock is held only if a majority of nodes accepted the same fencing
//! token and the attempt finished with validity left after subtracting
//! elapsed time and the drift margin. Individual node failures are logged
//! and counted as "not granted"; they never abort an operation on their own.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::LockConfig;
use crate::error::{LockError, NodeError};
use crate::guard::LockGuard;
use crate::infrastructure::LockNode;
use crate::quorum::{self, QuorumVerdict};
use crate::types::{Lock, ManagerStats, NodeHealth, ReleaseReport};

#[derive(Default)]
struct Stats {
    acquired: AtomicU64,
    released: AtomicU64,
    extended: AtomicU64,
    failed_attempts: AtomicU64,
    exhausted: AtomicU64,
}

pub struct DistributedLockManager {
    nodes: Vec<Arc<dyn LockNode>>,
    config: LockConfig,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
    stats: Stats,
}

impl DistributedLockManager {
    /// Validate the configuration and take ownership of the node set.
    pub fn open(
        config: LockConfig,
        nodes: Vec<Arc<dyn LockNode>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LockError> {
        config.validate()?;
        if nodes.is_empty() {
            return Err(LockError::Config("at least one lock node is required".into()));
        }

        debug!(
            nodes = nodes.len(),
            quorum = quorum::quorum(nodes.len()),
            ttl_ms = config.ttl_ms,
            "Lock manager opened"
        );

        Ok(Self {
            nodes,
            config,
            clock,
            closed: AtomicBool::new(false),
            stats: Stats::default(),
        })
    }

    /// Stop accepting acquisitions and close every node.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for node in &self.nodes {
            node.close();
        }
        debug!("Lock manager closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn quorum(&self) -> usize {
        quorum::quorum(self.nodes.len())
    }

    /// Acquire `resource` for `ttl_ms`, retrying with jitter until the
    /// retry count or budget runs out.
    pub fn acquire(&self, resource: &str, ttl_ms: u64) -> Result<Lock, LockError> {
        let max_attempts = self.config.retry_count.saturating_add(1);
        let started = self.clock.now_ms();
        let mut attempts = 0u32;

        loop {
            self.ensure_open()?;
            attempts += 1;

            let last = match self.attempt(resource, ttl_ms) {
                Ok(lock) => {
                    self.stats.acquired.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        resource,
                        attempts,
                        expires_at = lock.expires_at,
                        "Lock acquired"
                    );
                    return Ok(lock);
                }
                Err(err) => err,
            };
            self.stats.failed_attempts.fetch_add(1, Ordering::Relaxed);

            let spent = self.clock.now_ms().saturating_sub(started);
            let over_budget = self
                .config
                .retry_budget_ms
                .is_some_and(|budget| spent >= budget);

            if attempts >= max_attempts || over_budget {
                self.stats.exhausted.fetch_add(1, Ordering::Relaxed);
                warn!(resource, attempts, spent_ms = spent, error = %last, "Lock unavailable");
                return Err(LockError::Unavailable {
                    resource: resource.to_string(),
                    attempts,
                    last: Box::new(last),
                });
            }

            let mut delay = quorum::retry_delay_ms(
                &mut rand::rng(),
                self.config.retry_delay_ms,
                self.config.retry_jitter_ms,
            );
            if let Some(budget) = self.config.retry_budget_ms {
                delay = delay.min(budget - spent);
            }
            debug!(resource, attempts, delay_ms = delay, error = %last, "Retrying lock");
            self.clock.sleep(delay);
        }
    }

    /// Acquire with the configured ttl and wrap the lock in a guard that
    /// releases it on drop.
    pub fn lock(&self, resource: &str) -> Result<LockGuard<'_>, LockError> {
        self.lock_with_ttl(resource, self.config.ttl_ms)
    }

    pub fn lock_with_ttl(&self, resource: &str, ttl_ms: u64) -> Result<LockGuard<'_>, LockError> {
        let lock = self.acquire(resource, ttl_ms)?;
        Ok(LockGuard::new(self, lock))
    }

    /// Run `f` while holding `resource`. The lock is released on every
    /// return path, including panics unwinding through `f`.
    pub fn using<R>(
        &self,
        resource: &str,
        ttl_ms: u64,
        f: impl FnOnce(&mut LockGuard<'_>) -> R,
    ) -> Result<R, LockError> {
        let mut guard = self.lock_with_ttl(resource, ttl_ms)?;
        Ok(f(&mut guard))
    }

    /// Best-effort delete of `lock` on every node. Never fails.
    pub fn release(&self, lock: &Lock) -> ReleaseReport {
        self.stats.released.fetch_add(1, Ordering::Relaxed);

        let results = self.fan_out(&self.nodes, |node| {
            node.try_delete(&lock.resource, &lock.fencing_token)
        });

        let mut report = ReleaseReport::default();
        for (node, result) in self.nodes.iter().zip(results) {
            match result {
                Ok(true) => report.released += 1,
                Ok(false) => report.mismatched += 1,
                Err(err) => {
                    warn!(resource = %lock.resource, node = node.name(), error = %err, "Release failed on node");
                    report.unreachable += 1;
                }
            }
        }

        if report.released == 0 {
            // Expired or taken over: the node-side ttl already freed it
            warn!(
                resource = %lock.resource,
                mismatched = report.mismatched,
                unreachable = report.unreachable,
                "Released a lock no node still held"
            );
        } else {
            debug!(resource = %lock.resource, released = report.released, "Lock released");
        }
        report
    }

    /// Refresh the ttl of a held lock. Keeps the fencing token.
    pub fn extend(&self, lock: &Lock, ttl_ms: u64) -> Result<Lock, LockError> {
        self.ensure_open()?;
        let start = self.clock.now_ms();

        let results = self.fan_out(&self.nodes, |node| {
            node.try_extend(&lock.resource, &lock.fencing_token, ttl_ms)
        });
        let granted = self.granted_nodes(&lock.resource, "extend", results).len();
        let elapsed = self.clock.now_ms().saturating_sub(start);

        let verdict =
            quorum::evaluate(granted, self.nodes.len(), ttl_ms, elapsed, self.config.drift_factor);
        match verdict_result(&lock.resource, verdict) {
            Ok(validity_ms) => {
                self.stats.extended.fetch_add(1, Ordering::Relaxed);
                debug!(resource = %lock.resource, validity_ms, "Lock extended");
                Ok(Lock::new(
                    lock.resource.clone(),
                    lock.fencing_token.clone(),
                    start,
                    ttl_ms,
                    validity_ms,
                ))
            }
            Err(err) => {
                warn!(resource = %lock.resource, error = %err, "Lock extension failed");
                Err(err)
            }
        }
    }

    /// Ping every node.
    pub fn health(&self) -> Vec<NodeHealth> {
        let results = self.fan_out(&self.nodes, |node| node.ping());
        self.nodes
            .iter()
            .zip(results)
            .map(|(node, result)| NodeHealth {
                node: node.name().to_string(),
                healthy: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            })
            .collect()
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            acquired: self.stats.acquired.load(Ordering::Relaxed),
            released: self.stats.released.load(Ordering::Relaxed),
            extended: self.stats.extended.load(Ordering::Relaxed),
            failed_attempts: self.stats.failed_attempts.load(Ordering::Relaxed),
            exhausted: self.stats.exhausted.load(Ordering::Relaxed),
        }
    }

    // ─── Single Attempt ─────────────────────────────────────────────────────

    fn attempt(&self, resource: &str, ttl_ms: u64) -> Result<Lock, LockError> {
        let token = nanoid::nanoid!();
        let start = self.clock.now_ms();

        let results = self.fan_out(&self.nodes, |node| node.try_set(resource, &token, ttl_ms));
        let granted = self.granted_nodes(resource, "acquire", results);
        let elapsed = self.clock.now_ms().saturating_sub(start);

        let verdict = quorum::evaluate(
            granted.len(),
            self.nodes.len(),
            ttl_ms,
            elapsed,
            self.config.drift_factor,
        );
        match verdict_result(resource, verdict) {
            Ok(validity_ms) => Ok(Lock::new(resource, token, start, ttl_ms, validity_ms)),
            Err(err) => {
                self.cleanup(resource, &token, &granted);
                Err(err)
            }
        }
    }

    /// Undo the grants of a failed attempt.
    fn cleanup(&self, resource: &str, token: &str, granted: &[Arc<dyn LockNode>]) {
        if granted.is_empty() {
            return;
        }
        let results = self.fan_out(granted, |node| node.try_delete(resource, token));
        for (node, result) in granted.iter().zip(results) {
            if let Err(err) = result {
                warn!(resource, node = node.name(), error = %err, "Cleanup of partial grant failed");
            }
        }
    }

    fn granted_nodes(
        &self,
        resource: &str,
        op: &str,
        results: Vec<Result<bool, NodeError>>,
    ) -> Vec<Arc<dyn LockNode>> {
        self.nodes
            .iter()
            .zip(results)
            .filter_map(|(node, result)| match result {
                Ok(true) => Some(Arc::clone(node)),
                Ok(false) => None,
                Err(err) => {
                    warn!(resource, op, node = node.name(), error = %err, "Lock node failed");
                    None
                }
            })
            .collect()
    }

    /// Run `op` against every node in parallel, preserving node order.
    fn fan_out<T, F>(&self, nodes: &[Arc<dyn LockNode>], op: F) -> Vec<Result<T, NodeError>>
    where
        T: Send,
        F: Fn(&dyn LockNode) -> Result<T, NodeError> + Sync,
    {
        if let [node] = nodes {
            return vec![op(node.as_ref())];
        }

        std::thread::scope(|scope| {
            let op = &op;
            let handles: Vec<_> = nodes
                .iter()
                .map(|node| scope.spawn(move || op(node.as_ref())))
                .collect();

            handles
                .into_iter()
                .zip(nodes)
                .map(|(handle, node)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(NodeError::Backend(format!("call to {} panicked", node.name())))
                    })
                })
                .collect()
        })
    }

    fn ensure_open(&self) -> Result<(), LockError> {
        if self.is_closed() {
            Err(LockError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Validity of a granted verdict, or the matching lock error.
fn verdict_result(resource: &str, verdict: QuorumVerdict) -> Result<u64, LockError> {
    match verdict {
        QuorumVerdict::Granted { validity_ms } => Ok(validity_ms),
        QuorumVerdict::QuorumNotReached { granted, quorum } => Err(LockError::QuorumNotReached {
            resource: resource.to_string(),
            granted,
            quorum,
        }),
        QuorumVerdict::LeaseTooShort { validity_ms } => Err(LockError::LeaseTooShort {
            resource: resource.to_string(),
            validity_ms,
        }),
    }
}
