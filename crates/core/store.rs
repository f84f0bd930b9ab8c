//! Store abstraction for the queue's lists.
//!
//! This module provides the trait-based abstraction the queue uses to talk to
//! its key-value store. The queue only needs a handful of list primitives; the
//! important one is the atomic tail-to-head transfer between two lists.
//!
//! "Head" is the left end of a list (where `lpush` inserts) and "tail" is the
//! right end (where `rpoplpush` takes from).

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Reply to one command of a committed batch.
///
/// [`Store::commit`] returns one reply per recorded command, in recording
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchReply {
    /// List length after an `lpush`.
    Len(usize),
    /// Whether an `expire` found its key.
    Expired(bool),
    /// Value moved by an `rpoplpush`, `None` if the source was empty.
    Value(Option<Vec<u8>>),
    /// Occurrences removed by an `lrem`.
    Removed(usize),
}

impl BatchReply {
    /// The length, if this is an `lpush` reply.
    pub fn as_len(&self) -> Option<usize> {
        match self {
            BatchReply::Len(len) => Some(*len),
            _ => None,
        }
    }

    /// Whether the key was found, if this is an `expire` reply.
    pub fn as_expired(&self) -> Option<bool> {
        match self {
            BatchReply::Expired(found) => Some(*found),
            _ => None,
        }
    }

    /// The moved value, if this is an `rpoplpush` reply.
    pub fn into_value(self) -> Option<Option<Vec<u8>>> {
        match self {
            BatchReply::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The removal count, if this is an `lrem` reply.
    pub fn as_removed(&self) -> Option<usize> {
        match self {
            BatchReply::Removed(removed) => Some(*removed),
            _ => None,
        }
    }
}

/// A caller-owned group of store commands executed together on commit.
///
/// Recording a command never touches the store. Results only exist once the
/// batch is handed to [`Store::commit`].
pub trait Batch: Send {
    /// Queue an insert at the head of `key`.
    fn lpush(&mut self, key: &str, value: &[u8]);

    /// Queue a TTL reset on `key`.
    fn expire(&mut self, key: &str, ttl: Duration);

    /// Queue an atomic tail-of-`src` to head-of-`dst` transfer.
    fn rpoplpush(&mut self, src: &str, dst: &str);

    /// Queue a remove-by-value on `key`.
    fn lrem(&mut self, key: &str, count: isize, value: &[u8]);

    /// Number of commands recorded so far.
    fn len(&self) -> usize;

    /// Whether no commands have been recorded.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Store trait for list operations.
///
/// Implementations must be thread-safe (Send + Sync) and must execute
/// `rpoplpush` and `brpoplpush` as single indivisible operations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Batch type accepted by [`Store::commit`].
    type Batch: Batch;

    /// Number of elements in a list. Missing keys have length 0.
    async fn llen(&self, key: &str) -> Result<usize>;

    /// Insert a value at the head of a list, returning the new length.
    async fn lpush(&self, key: &str, value: &[u8]) -> Result<usize>;

    /// Set or reset the TTL of a key. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remaining TTL of a key.
    ///
    /// Returns `None` when the key does not exist or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Atomically move the tail of `src` to the head of `dst`.
    ///
    /// Returns `None` if `src` is empty.
    async fn rpoplpush(&self, src: &str, dst: &str) -> Result<Option<Vec<u8>>>;

    /// Blocking variant of [`Store::rpoplpush`].
    ///
    /// Waits up to `timeout` for `src` to receive a value. A zero timeout waits
    /// indefinitely. Returns `None` only when the timeout elapses.
    async fn brpoplpush(&self, src: &str, dst: &str, timeout: Duration)
        -> Result<Option<Vec<u8>>>;

    /// Remove occurrences of `value` from a list, returning how many were removed.
    ///
    /// `count > 0` removes up to `count` matches scanning head to tail,
    /// `count < 0` scans tail to head, and `0` removes every match.
    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize>;

    /// Elements between `start` and `stop` inclusive, head first.
    ///
    /// Negative indices count from the tail (`-1` is the last element).
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>>;

    /// Delete a key. Returns whether it existed.
    async fn del(&self, key: &str) -> Result<bool>;

    /// Start a new batch.
    fn batch(&self) -> Self::Batch;

    /// Execute every command recorded in `batch`.
    ///
    /// Returns one reply per command, in the order they were recorded.
    async fn commit(&self, batch: Self::Batch) -> Result<Vec<BatchReply>>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    type Batch = S::Batch;

    async fn llen(&self, key: &str) -> Result<usize> {
        (**self).llen(key).await
    }

    async fn lpush(&self, key: &str, value: &[u8]) -> Result<usize> {
        (**self).lpush(key, value).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        (**self).expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        (**self).ttl(key).await
    }

    async fn rpoplpush(&self, src: &str, dst: &str) -> Result<Option<Vec<u8>>> {
        (**self).rpoplpush(src, dst).await
    }

    async fn brpoplpush(
        &self,
        src: &str,
        dst: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        (**self).brpoplpush(src, dst, timeout).await
    }

    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize> {
        (**self).lrem(key, count, value).await
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>> {
        (**self).lrange(key, start, stop).await
    }

    async fn del(&self, key: &str) -> Result<bool> {
        (**self).del(key).await
    }

    fn batch(&self) -> Self::Batch {
        (**self).batch()
    }

    async fn commit(&self, batch: Self::Batch) -> Result<Vec<BatchReply>> {
        (**self).commit(batch).await
    }
}
