//! Redis lock node: `SET NX PX` to acquire, Lua scripts for the
//! compare-and-delete and compare-and-expire steps.
//!
//! Enable with the `redis` feature flag.

use parking_lot::Mutex;
use std::time::Duration;

use crate::error::NodeError;
use crate::infrastructure::LockNode;

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

const EXTEND_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("pexpire", KEYS[1], ARGV[2])
else
    return 0
end
"#;

/// One Redis instance acting as a lock node.
///
/// The connection is opened lazily and dropped after any I/O error so the
/// next call reconnects.
pub struct RedisLockNode {
    name: String,
    client: redis::Client,
    timeout: Duration,
    conn: Mutex<Option<redis::Connection>>,
    release: redis::Script,
    extend: redis::Script,
}

impl RedisLockNode {
    /// Example URLs: `redis://127.0.0.1:6379/`, `redis://:password@host/0`
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NodeError> {
        let client = redis::Client::open(url)
            .map_err(|e| NodeError::Backend(format!("invalid redis url '{}': {}", url, e)))?;

        Ok(Self {
            name: url.to_string(),
            client,
            timeout,
            conn: Mutex::new(None),
            release: redis::Script::new(RELEASE_SCRIPT),
            extend: redis::Script::new(EXTEND_SCRIPT),
        })
    }

    fn map_err(&self, err: redis::RedisError) -> NodeError {
        if err.is_timeout() {
            NodeError::Timeout(self.name.clone())
        } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            NodeError::Unreachable(self.name.clone())
        } else {
            NodeError::Backend(format!("{}: {}", self.name, err))
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> Result<T, NodeError> {
        let mut slot = self.conn.lock();
        if slot.is_none() {
            let conn = self
                .client
                .get_connection_with_timeout(self.timeout)
                .map_err(|e| self.map_err(e))?;
            conn.set_read_timeout(Some(self.timeout))
                .map_err(|e| self.map_err(e))?;
            conn.set_write_timeout(Some(self.timeout))
                .map_err(|e| self.map_err(e))?;
            *slot = Some(conn);
        }

        let Some(conn) = slot.as_mut() else {
            return Err(NodeError::Unreachable(self.name.clone()));
        };

        let result = f(conn);
        result.map_err(|err| {
            if err.is_unrecoverable_error() || err.is_io_error() {
                *slot = None;
            }
            self.map_err(err)
        })
    }
}

impl LockNode for RedisLockNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_set(&self, resource: &str, token: &str, ttl_ms: u64) -> Result<bool, NodeError> {
        let reply: Option<String> = self.with_conn(|conn| {
            redis::cmd("SET")
                .arg(resource)
                .arg(token)
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query(conn)
        })?;
        Ok(reply.is_some())
    }

    fn try_delete(&self, resource: &str, token: &str) -> Result<bool, NodeError> {
        let deleted: i64 =
            self.with_conn(|conn| self.release.key(resource).arg(token).invoke(conn))?;
        Ok(deleted == 1)
    }

    fn try_extend(&self, resource: &str, token: &str, ttl_ms: u64) -> Result<bool, NodeError> {
        let extended: i64 = self.with_conn(|conn| {
            self.extend
                .key(resource)
                .arg(token)
                .arg(ttl_ms)
                .invoke(conn)
        })?;
        Ok(extended == 1)
    }

    fn ping(&self) -> Result<(), NodeError> {
        let _: String = self.with_conn(|conn| redis::cmd("PING").query(conn))?;
        Ok(())
    }

    fn close(&self) {
        self.conn.lock().take();
    }
}
