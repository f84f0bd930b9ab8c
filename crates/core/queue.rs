//! The reliable queue: a two-list handoff on top of a [`Store`].
//!
//! Producers push onto the access list. Consumers pop, which atomically moves
//! the oldest pending value to the process list, and ack once done, which
//! removes it from there. A consumer that dies between pop and ack leaves its
//! value in the process list where recovery tooling can find it.

use std::time::Duration;

use crate::config::{validate_ttl, QueueConfig};
use crate::error::Result;
use crate::exec::{Exec, Reply};
use crate::keys::{QueueKeys, QueueName};
use crate::store::{Batch, Store};

/// Handle to a named reliable queue.
///
/// The handle holds no queue data. Any number of handles (in any number of
/// processes) built with the same name operate on the same lists.
#[derive(Clone)]
pub struct ReliableQueue<S: Store> {
    name: QueueName,
    keys: QueueKeys,
    store: S,
    ttl: Option<Duration>,
}

impl<S: Store> ReliableQueue<S> {
    /// Create a queue handle.
    ///
    /// `ttl`, when set, is re-applied to the access list on every push, so an
    /// access list that sees no pushes for `ttl` expires. A TTL under one
    /// millisecond is rejected with [`RqError::Config`](crate::RqError::Config).
    pub fn new(name: QueueName, store: S, ttl: Option<Duration>) -> Result<Self> {
        validate_ttl(ttl)?;
        let keys = QueueKeys::new(&name);
        Ok(Self {
            name,
            keys,
            store,
            ttl,
        })
    }

    /// Create a queue handle from a config.
    pub fn from_config(config: QueueConfig, store: S) -> Result<Self> {
        Self::new(config.name, store, config.ttl)
    }

    /// The queue name.
    pub fn name(&self) -> &QueueName {
        &self.name
    }

    /// The list keys this queue addresses.
    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    /// The configured access list TTL.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pending plus in-flight values.
    ///
    /// The two lengths are read separately, so under concurrent pops the sum
    /// can be off by one.
    pub async fn length(&self) -> Result<usize> {
        let pending = self.store.llen(self.keys.access()).await?;
        let in_flight = self.store.llen(self.keys.process()).await?;
        Ok(pending + in_flight)
    }

    /// Push a value onto the back of the queue.
    ///
    /// Returns the access list length after the insert. When a batch is
    /// supplied the push and the TTL refresh are only recorded; they are atomic
    /// together only if the batch commits atomically. The queued index points
    /// at the push's [`BatchReply::Len`](crate::BatchReply::Len).
    pub async fn push(
        &self,
        value: impl AsRef<[u8]>,
        exec: Exec<'_, S::Batch>,
    ) -> Result<Reply<usize>> {
        let value = value.as_ref();
        match exec {
            Exec::Batched(batch) => {
                let index = batch.len();
                batch.lpush(self.keys.access(), value);
                if let Some(ttl) = self.ttl {
                    batch.expire(self.keys.access(), ttl);
                }
                tracing::trace!(queue = %self.name, index = index, "Push queued in batch");
                Ok(Reply::Queued(index))
            }
            Exec::Immediate => {
                let len = self.store.lpush(self.keys.access(), value).await?;
                if let Some(ttl) = self.ttl {
                    self.store.expire(self.keys.access(), ttl).await?;
                }
                tracing::debug!(queue = %self.name, len = len, "Value pushed");
                Ok(Reply::Ready(len))
            }
        }
    }

    /// Take the next value, moving it to the process list. Never blocks.
    ///
    /// Returns `None` when nothing is pending. A batched pop's value is the
    /// [`BatchReply::Value`](crate::BatchReply::Value) at the queued index.
    pub async fn pop(&self, exec: Exec<'_, S::Batch>) -> Result<Reply<Option<Vec<u8>>>> {
        match exec {
            Exec::Batched(batch) => {
                let index = batch.len();
                batch.rpoplpush(self.keys.access(), self.keys.process());
                tracing::trace!(queue = %self.name, index = index, "Pop queued in batch");
                Ok(Reply::Queued(index))
            }
            Exec::Immediate => {
                let value = self
                    .store
                    .rpoplpush(self.keys.access(), self.keys.process())
                    .await?;
                tracing::debug!(queue = %self.name, found = value.is_some(), "Pop");
                Ok(Reply::Ready(value))
            }
        }
    }

    /// Take the next value, waiting up to `timeout` if nothing is pending.
    ///
    /// A zero timeout waits indefinitely. Returns `None` only when the timeout
    /// elapses. This always runs immediately: a blocking transfer cannot wait
    /// inside a batch that has not been committed yet.
    pub async fn bpop(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let value = self
            .store
            .brpoplpush(self.keys.access(), self.keys.process(), timeout)
            .await?;
        tracing::debug!(
            queue = %self.name,
            timeout_ms = timeout.as_millis() as u64,
            found = value.is_some(),
            "Blocking pop"
        );
        Ok(value)
    }

    /// Acknowledge a value, removing one occurrence from the process list.
    ///
    /// Returns `false` if the value was not in flight. Acking twice is harmless.
    pub async fn ack(
        &self,
        value: impl AsRef<[u8]>,
        exec: Exec<'_, S::Batch>,
    ) -> Result<Reply<bool>> {
        let value = value.as_ref();
        match exec {
            Exec::Batched(batch) => {
                let index = batch.len();
                batch.lrem(self.keys.process(), 1, value);
                tracing::trace!(queue = %self.name, index = index, "Ack queued in batch");
                Ok(Reply::Queued(index))
            }
            Exec::Immediate => {
                let removed = self.store.lrem(self.keys.process(), 1, value).await?;
                let acked = removed > 0;
                if acked {
                    tracing::debug!(queue = %self.name, "Value acknowledged");
                } else {
                    tracing::debug!(queue = %self.name, "Ack missed, value not in flight");
                }
                Ok(Reply::Ready(acked))
            }
        }
    }
}

impl<S: Store> std::fmt::Debug for ReliableQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReliableQueue")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
