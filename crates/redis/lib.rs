//! Redis store for rqueue.
//!
//! This crate provides the Redis-backed [`Store`] for a [`rqueue_core::ReliableQueue`].
//! Pops map to `RPOPLPUSH`/`BRPOPLPUSH`, so the access-to-process transfer is a
//! single server-side command.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rqueue_core::{Exec, QueueName, ReliableQueue, Store};
//! use rqueue_redis::RedisStore;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> rqueue_core::Result<()> {
//!     let store = RedisStore::new("redis://localhost").await?;
//!     let ttl = Some(Duration::from_secs(3600));
//!     let queue = ReliableQueue::new(QueueName::new("emails")?, store, ttl)?;
//!
//!     // Push and TTL refresh inside one MULTI/EXEC.
//!     let mut batch = queue.store().batch();
//!     queue.push("welcome:42", Exec::batched(&mut batch)).await?;
//!     let replies = queue.store().commit(batch).await?;
//!     assert_eq!(replies[0].as_len(), Some(1));
//!
//!     if let Some(value) = queue.bpop(Duration::from_secs(5)).await? {
//!         queue.ack(&value, Exec::Immediate).await?;
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use rqueue_core::{Batch, BatchReply, Result, RqError, Store};
use std::time::Duration;

/// Shape of the reply a recorded command produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyKind {
    Len,
    Expired,
    Value,
    Removed,
}

impl ReplyKind {
    fn decode(self, value: &redis::Value) -> redis::RedisResult<BatchReply> {
        Ok(match self {
            ReplyKind::Len => BatchReply::Len(redis::from_redis_value(value)?),
            ReplyKind::Expired => BatchReply::Expired(redis::from_redis_value(value)?),
            ReplyKind::Value => BatchReply::Value(redis::from_redis_value(value)?),
            ReplyKind::Removed => BatchReply::Removed(redis::from_redis_value(value)?),
        })
    }
}

/// A Redis pipeline holding queued queue commands.
pub struct RedisBatch {
    pipe: redis::Pipeline,
    kinds: Vec<ReplyKind>,
}

impl RedisBatch {
    /// A batch that commits inside MULTI/EXEC.
    pub fn atomic() -> Self {
        let mut pipe = redis::pipe();
        pipe.atomic();
        Self {
            pipe,
            kinds: Vec::new(),
        }
    }

    /// A plain pipeline: one round trip, no transaction.
    pub fn plain() -> Self {
        Self {
            pipe: redis::pipe(),
            kinds: Vec::new(),
        }
    }

    fn decode(&self, values: &[redis::Value]) -> Result<Vec<BatchReply>> {
        if values.len() != self.kinds.len() {
            return Err(RqError::Store(format!(
                "expected {} pipeline replies, got {}",
                self.kinds.len(),
                values.len()
            )));
        }
        self.kinds
            .iter()
            .zip(values)
            .map(|(kind, value)| {
                kind.decode(value)
                    .map_err(|e| RqError::Store(e.to_string()))
            })
            .collect()
    }
}

impl Default for RedisBatch {
    fn default() -> Self {
        Self::atomic()
    }
}

impl Batch for RedisBatch {
    fn lpush(&mut self, key: &str, value: &[u8]) {
        self.pipe.lpush(key, value);
        self.kinds.push(ReplyKind::Len);
    }

    fn expire(&mut self, key: &str, ttl: Duration) {
        self.pipe
            .cmd("PEXPIRE")
            .arg(key)
            .arg(ttl.as_millis() as u64);
        self.kinds.push(ReplyKind::Expired);
    }

    fn rpoplpush(&mut self, src: &str, dst: &str) {
        self.pipe.rpoplpush(src, dst);
        self.kinds.push(ReplyKind::Value);
    }

    fn lrem(&mut self, key: &str, count: isize, value: &[u8]) {
        self.pipe.lrem(key, count, value);
        self.kinds.push(ReplyKind::Removed);
    }

    fn len(&self) -> usize {
        self.kinds.len()
    }
}

/// Redis store for reliable queues.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| RqError::Store(e.to_string()))?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(Self { client, conn })
    }

    /// Create a store from an existing client and connection manager.
    pub fn with_connection(client: redis::Client, conn: ConnectionManager) -> Self {
        Self { client, conn }
    }

    /// Get a dedicated connection for blocking commands.
    ///
    /// A blocking command on the shared manager would hold up every other
    /// command multiplexed on it until the wait ends.
    async fn blocking_conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RqError::Store(e.to_string()))
    }
}

#[async_trait]
impl Store for RedisStore {
    type Batch = RedisBatch;

    async fn llen(&self, key: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .llen(key)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(len)
    }

    async fn lpush(&self, key: &str, value: &[u8]) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .lpush(key, value)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(len)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let set: bool = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(set)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        // -2: no such key, -1: no expiry
        let ms: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(u64::try_from(ms).ok().map(Duration::from_millis))
    }

    async fn rpoplpush(&self, src: &str, dst: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .rpoplpush(src, dst)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(value)
    }

    async fn brpoplpush(
        &self,
        src: &str,
        dst: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let mut conn = self.blocking_conn().await?;
        let value: Option<Vec<u8>> = redis::cmd("BRPOPLPUSH")
            .arg(src)
            .arg(dst)
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(value)
    }

    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize> {
        let mut conn = self.conn.clone();
        let removed: usize = conn
            .lrem(key, count, value)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(removed)
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let values: Vec<Vec<u8>> = conn
            .lrange(key, start, stop)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(values)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: usize = conn
            .del(key)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        Ok(deleted > 0)
    }

    fn batch(&self) -> Self::Batch {
        RedisBatch::atomic()
    }

    async fn commit(&self, batch: Self::Batch) -> Result<Vec<BatchReply>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let values: Vec<redis::Value> = batch
            .pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| RqError::Store(e.to_string()))?;
        batch.decode(&values)
    }
}


// ========== Integration Tests (require Redis) ==========
