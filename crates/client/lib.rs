//! # rqueue-client - Admin client for reliable queues
//!
//! This crate provides an `AdminClient` for inspecting a queue's lists and for
//! manually recovering values that consumers popped but never acknowledged.
//!
//! ## Features
//!
//! - **Statistics**: pending and in-flight counts per queue
//! - **Inspection**: page through pending or in-flight values, oldest first
//! - **Recovery**: move in-flight values back to the access list, or drop them
//! - **Purge**: delete both lists of a queue
//!
//! Nothing here runs on its own. Deciding that an in-flight value is stuck
//! (and not just slow) is up to the operator or whatever tooling drives this
//! client; requeueing a value whose consumer is still alive delivers it twice.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rqueue_client::AdminClient;
//! use rqueue_core::QueueName;
//! use rqueue_redis::RedisStore;
//!
//! #[tokio::main]
//! async fn main() -> rqueue_core::Result<()> {
//!     let admin = AdminClient::new(RedisStore::new("redis://localhost").await?);
//!     let name = QueueName::new("emails")?;
//!
//!     let stats = admin.stats(&name).await?;
//!     println!("pending={} in_flight={}", stats.pending, stats.in_flight);
//!
//!     // Hand every unacknowledged value back to consumers.
//!     let requeued = admin.requeue_all(&name).await?;
//!     println!("requeued {}", requeued);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use rqueue_core::{QueueKeys, QueueName, Result, RqError, Store};

/// Statistics for a single queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// The queue name.
    pub queue: String,
    /// Values waiting in the access list.
    pub pending: usize,
    /// Values popped but not yet acknowledged.
    pub in_flight: usize,
}

impl QueueStats {
    /// Pending plus in-flight, the same figure `ReliableQueue::length` reports.
    pub fn total(&self) -> usize {
        self.pending + self.in_flight
    }
}

/// Admin client for inspecting and recovering reliable queues.
///
/// This client provides methods for:
/// - Getting queue statistics
/// - Listing pending and in-flight values
/// - Requeueing or discarding in-flight values
/// - Purging a queue
#[derive(Clone)]
pub struct AdminClient<S: Store> {
    store: S,
}

impl<S: Store> AdminClient<S> {
    /// Create a new admin client.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ========== Statistics ==========

    /// Get pending and in-flight counts for a queue.
    pub async fn stats(&self, name: &QueueName) -> Result<QueueStats> {
        let keys = QueueKeys::new(name);
        let (pending, in_flight) = tokio::try_join!(
            self.store.llen(keys.access()),
            self.store.llen(keys.process()),
        )?;

        Ok(QueueStats {
            queue: name.to_string(),
            pending,
            in_flight,
        })
    }

    /// Remaining lifetime of the access list, if it has one.
    pub async fn access_ttl(&self, name: &QueueName) -> Result<Option<Duration>> {
        self.store.ttl(QueueKeys::new(name).access()).await
    }

    // ========== Inspection ==========

    /// List pending values, oldest (next to be popped) first.
    pub async fn pending(
        &self,
        name: &QueueName,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Vec<u8>>> {
        self.oldest_first(QueueKeys::new(name).access(), limit, offset)
            .await
    }

    /// List in-flight values, longest in flight first.
    pub async fn in_flight(
        &self,
        name: &QueueName,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Vec<u8>>> {
        self.oldest_first(QueueKeys::new(name).process(), limit, offset)
            .await
    }

    /// Page through a list from its tail.
    ///
    /// Bounds past `isize::MAX` are clamped, which no list can reach, so an
    /// oversized `limit` reads the whole remainder.
    async fn oldest_first(&self, key: &str, limit: usize, offset: usize) -> Result<Vec<Vec<u8>>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let tail_index = |n: usize| -isize::try_from(n).unwrap_or(isize::MAX);
        let start = tail_index(offset.saturating_add(limit));
        let stop = tail_index(offset.saturating_add(1));
        let mut values = self.store.lrange(key, start, stop).await?;
        values.reverse();
        Ok(values)
    }

    // ========== Recovery ==========

    /// Move the longest in-flight value back to the access list.
    ///
    /// This is a single atomic transfer, so the value is never in both lists
    /// or in neither. It re-enters at the head, behind everything already
    /// pending. Returns `None` if nothing is in flight.
    pub async fn requeue_oldest(&self, name: &QueueName) -> Result<Option<Vec<u8>>> {
        let keys = QueueKeys::new(name);
        let value = self
            .store
            .rpoplpush(keys.process(), keys.access())
            .await?;

        if value.is_some() {
            tracing::info!(queue = %name, "Requeued in-flight value");
        }
        Ok(value)
    }

    /// Move every in-flight value back to the access list.
    ///
    /// Returns how many values were moved.
    pub async fn requeue_all(&self, name: &QueueName) -> Result<usize> {
        let keys = QueueKeys::new(name);
        let mut requeued = 0;

        while self
            .store
            .rpoplpush(keys.process(), keys.access())
            .await?
            .is_some()
        {
            requeued += 1;
        }

        if requeued > 0 {
            tracing::info!(queue = %name, requeued = requeued, "Requeued all in-flight values");
        }
        Ok(requeued)
    }

    /// Drop one in-flight occurrence of `value` without requeueing it.
    ///
    /// Returns `false` if the value was not in flight.
    pub async fn discard(&self, name: &QueueName, value: impl AsRef<[u8]>) -> Result<bool> {
        let removed = self
            .store
            .lrem(QueueKeys::new(name).process(), 1, value.as_ref())
            .await?;

        if removed > 0 {
            tracing::warn!(queue = %name, "Discarded in-flight value");
        }
        Ok(removed > 0)
    }

    /// Delete both lists of a queue, returning what they held.
    ///
    /// The counts are read before the deletes, which are not atomic with each
    /// other; values pushed concurrently may survive or be dropped uncounted.
    pub async fn purge(&self, name: &QueueName) -> Result<QueueStats> {
        let keys = QueueKeys::new(name);
        let stats = self.stats(name).await?;

        self.store.del(keys.access()).await?;
        self.store.del(keys.process()).await?;

        tracing::warn!(
            queue = %name,
            pending = stats.pending,
            in_flight = stats.in_flight,
            "Purged queue"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqueue_core::{Exec, MemoryStore, ReliableQueue};

    fn setup(name: &str) -> (ReliableQueue<MemoryStore>, AdminClient<MemoryStore>, QueueName) {
        let store = MemoryStore::new();
        let name = QueueName::new(name).unwrap();
        let queue = ReliableQueue::new(name.clone(), store.clone(), None).unwrap();
        (queue, AdminClient::new(store), name)
    }

    async fn push_all(queue: &ReliableQueue<MemoryStore>, values: &[&str]) {
        for v in values {
            queue.push(v, Exec::Immediate).await.unwrap();
        }
    }

    async fn pop(queue: &ReliableQueue<MemoryStore>) -> Option<Vec<u8>> {
        queue.pop(Exec::Immediate).await.unwrap().ready().unwrap()
    }

    fn bytes(values: &[&str]) -> Vec<Vec<u8>> {
        values.iter().map(|v| v.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_queue_stats_total() {
        let stats = QueueStats {
            queue: "q".to_string(),
            pending: 3,
            in_flight: 2,
        };
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn test_queue_stats_serialization() {
        let stats = QueueStats {
            queue: "emails".to_string(),
            pending: 10,
            in_flight: 4,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"queue\":\"emails\""));
        assert!(json.contains("\"pending\":10"));
        assert!(json.contains("\"in_flight\":4"));

        let back: QueueStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }

    #[tokio::test]
    async fn test_stats_matches_queue_length() {
        let (queue, admin, name) = setup("stats");
        push_all(&queue, &["a", "b", "c"]).await;
        pop(&queue).await;

        let stats = admin.stats(&name).await.unwrap();
        assert_eq!(stats.queue, "stats");
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.in_flight, 1);
        assert_eq!(stats.total(), queue.length().await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_oldest_first_with_paging() {
        let (queue, admin, name) = setup("paging");
        push_all(&queue, &["v1", "v2", "v3", "v4", "v5"]).await;

        assert_eq!(admin.pending(&name, 2, 0).await.unwrap(), bytes(&["v1", "v2"]));
        assert_eq!(admin.pending(&name, 2, 2).await.unwrap(), bytes(&["v3", "v4"]));
        assert_eq!(admin.pending(&name, 2, 4).await.unwrap(), bytes(&["v5"]));
        assert!(admin.pending(&name, 2, 6).await.unwrap().is_empty());
        assert!(admin.pending(&name, 0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paging_with_unbounded_limit_and_offset() {
        let (queue, admin, name) = setup("unbounded");
        push_all(&queue, &["v1", "v2", "v3"]).await;

        assert_eq!(
            admin.pending(&name, usize::MAX, 0).await.unwrap(),
            bytes(&["v1", "v2", "v3"])
        );
        assert_eq!(
            admin.pending(&name, usize::MAX, 1).await.unwrap(),
            bytes(&["v2", "v3"])
        );
        assert!(admin.pending(&name, 1, usize::MAX).await.unwrap().is_empty());
        assert!(admin
            .pending(&name, usize::MAX, usize::MAX)
            .await
            .unwrap()
            .is_empty());

        pop(&queue).await;
        assert_eq!(
            admin.in_flight(&name, usize::MAX, 0).await.unwrap(),
            bytes(&["v1"])
        );
    }

    #[tokio::test]
    async fn test_in_flight_lists_unacked_values() {
        let (queue, admin, name) = setup("inflight");
        push_all(&queue, &["v1", "v2", "v3"]).await;
        pop(&queue).await;
        pop(&queue).await;

        assert_eq!(admin.in_flight(&name, 10, 0).await.unwrap(), bytes(&["v1", "v2"]));

        queue.ack("v1", Exec::Immediate).await.unwrap();
        assert_eq!(admin.in_flight(&name, 10, 0).await.unwrap(), bytes(&["v2"]));
    }

    #[tokio::test]
    async fn test_requeue_oldest_returns_value_to_consumers() {
        let (queue, admin, name) = setup("requeue");
        push_all(&queue, &["v1"]).await;
        pop(&queue).await;

        let requeued = admin.requeue_oldest(&name).await.unwrap();
        assert_eq!(requeued.as_deref(), Some(&b"v1"[..]));

        let stats = admin.stats(&name).await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(pop(&queue).await.as_deref(), Some(&b"v1"[..]));
    }

    #[tokio::test]
    async fn test_requeue_goes_behind_pending_values() {
        let (queue, admin, name) = setup("requeue-order");
        push_all(&queue, &["stuck", "next"]).await;
        pop(&queue).await;

        admin.requeue_oldest(&name).await.unwrap();
        assert_eq!(pop(&queue).await.as_deref(), Some(&b"next"[..]));
        assert_eq!(pop(&queue).await.as_deref(), Some(&b"stuck"[..]));
    }

    #[tokio::test]
    async fn test_requeue_oldest_on_empty() {
        let (_queue, admin, name) = setup("requeue-empty");
        assert!(admin.requeue_oldest(&name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requeue_all() {
        let (queue, admin, name) = setup("requeue-all");
        push_all(&queue, &["a", "b", "c", "d"]).await;
        for _ in 0..3 {
            pop(&queue).await;
        }

        assert_eq!(admin.requeue_all(&name).await.unwrap(), 3);
        let stats = admin.stats(&name).await.unwrap();
        assert_eq!(stats.pending, 4);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(admin.requeue_all(&name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_discard() {
        let (queue, admin, name) = setup("discard");
        push_all(&queue, &["poison"]).await;
        pop(&queue).await;

        assert!(admin.discard(&name, "poison").await.unwrap());
        assert!(!admin.discard(&name, "poison").await.unwrap());
        assert_eq!(queue.length().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge() {
        let (queue, admin, name) = setup("purge");
        push_all(&queue, &["a", "b", "c"]).await;
        pop(&queue).await;

        let purged = admin.purge(&name).await.unwrap();
        assert_eq!(purged.pending, 2);
        assert_eq!(purged.in_flight, 1);
        assert_eq!(queue.length().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_ttl() {
        let store = MemoryStore::new();
        let name = QueueName::new("ttl").unwrap();
        let ttl = Some(Duration::from_secs(30));
        let queue = ReliableQueue::new(name.clone(), store.clone(), ttl).unwrap();
        let admin = AdminClient::new(store);

        assert!(admin.access_ttl(&name).await.unwrap().is_none());
        queue.push("a", Exec::Immediate).await.unwrap();
        assert_eq!(
            admin.access_ttl(&name).await.unwrap(),
            Some(Duration::from_secs(30))
        );
    }
}
