//! In-process store with Redis list semantics.
//!
//! `MemoryStore` implements the full [`Store`] surface on top of a mutex-guarded
//! map of `VecDeque`s. Every command runs under a single lock, which gives the
//! same per-command atomicity a Redis server gives, and a whole batch is applied
//! under one lock acquisition like MULTI/EXEC. Keys expire lazily on access.
//!
//! It is intended for tests, demos and single-process deployments.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::{Result, RqError};
use crate::store::{Batch, BatchReply, Store};

#[derive(Debug, Clone)]
enum Command {
    LPush { key: String, value: Vec<u8> },
    Expire { key: String, ttl: Duration },
    RPopLPush { src: String, dst: String },
    LRem { key: String, count: isize, value: Vec<u8> },
}

/// Batch of commands for a [`MemoryStore`], applied atomically on commit.
#[derive(Debug, Default)]
pub struct MemoryBatch {
    commands: Vec<Command>,
}

impl Batch for MemoryBatch {
    fn lpush(&mut self, key: &str, value: &[u8]) {
        self.commands.push(Command::LPush {
            key: key.to_string(),
            value: value.to_vec(),
        });
    }

    fn expire(&mut self, key: &str, ttl: Duration) {
        self.commands.push(Command::Expire {
            key: key.to_string(),
            ttl,
        });
    }

    fn rpoplpush(&mut self, src: &str, dst: &str) {
        self.commands.push(Command::RPopLPush {
            src: src.to_string(),
            dst: dst.to_string(),
        });
    }

    fn lrem(&mut self, key: &str, count: isize, value: &[u8]) {
        self.commands.push(Command::LRem {
            key: key.to_string(),
            count,
            value: value.to_vec(),
        });
    }

    fn len(&self) -> usize {
        self.commands.len()
    }
}

#[derive(Debug, Default)]
struct State {
    lists: HashMap<String, VecDeque<Vec<u8>>>,
    expiries: HashMap<String, Instant>,
}

impl State {
    /// Drop `key` if its deadline has passed.
    fn evict_expired(&mut self, key: &str) {
        let expired = self
            .expiries
            .get(key)
            .is_some_and(|deadline| *deadline <= Instant::now());
        if expired {
            self.remove(key);
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        self.expiries.remove(key);
        self.lists.remove(key).is_some()
    }

    /// Empty lists do not exist.
    fn remove_if_empty(&mut self, key: &str) {
        if self.lists.get(key).is_some_and(VecDeque::is_empty) {
            self.remove(key);
        }
    }

    fn list(&mut self, key: &str) -> Option<&VecDeque<Vec<u8>>> {
        self.evict_expired(key);
        self.lists.get(key)
    }

    fn llen(&mut self, key: &str) -> usize {
        self.list(key).map_or(0, VecDeque::len)
    }

    fn lpush(&mut self, key: &str, value: Vec<u8>) -> usize {
        self.evict_expired(key);
        let list = self.lists.entry(key.to_string()).or_default();
        list.push_front(value);
        list.len()
    }

    fn expire(&mut self, key: &str, ttl: Duration) -> bool {
        self.evict_expired(key);
        if !self.lists.contains_key(key) {
            return false;
        }
        self.expiries.insert(key.to_string(), Instant::now() + ttl);
        true
    }

    fn ttl(&mut self, key: &str) -> Option<Duration> {
        self.evict_expired(key);
        if !self.lists.contains_key(key) {
            return None;
        }
        self.expiries
            .get(key)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn rpoplpush(&mut self, src: &str, dst: &str) -> Option<Vec<u8>> {
        self.evict_expired(src);
        self.evict_expired(dst);
        let value = self.lists.get_mut(src)?.pop_back()?;
        self.remove_if_empty(src);
        self.lists
            .entry(dst.to_string())
            .or_default()
            .push_front(value.clone());
        Some(value)
    }

    fn lrem(&mut self, key: &str, count: isize, value: &[u8]) -> usize {
        self.evict_expired(key);
        let Some(list) = self.lists.get_mut(key) else {
            return 0;
        };

        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs()
        };
        let mut removed = 0;

        if count >= 0 {
            let mut i = 0;
            while i < list.len() && removed < limit {
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < limit {
                i -= 1;
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }

        self.remove_if_empty(key);
        removed
    }

    fn lrange(&mut self, key: &str, start: isize, stop: isize) -> Vec<Vec<u8>> {
        let Some(list) = self.list(key) else {
            return Vec::new();
        };
        let len = list.len() as isize;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Vec::new();
        }
        list.range(start as usize..=stop as usize).cloned().collect()
    }

    fn apply(&mut self, command: Command) -> BatchReply {
        match command {
            Command::LPush { key, value } => BatchReply::Len(self.lpush(&key, value)),
            Command::Expire { key, ttl } => BatchReply::Expired(self.expire(&key, ttl)),
            Command::RPopLPush { src, dst } => BatchReply::Value(self.rpoplpush(&src, &dst)),
            Command::LRem { key, count, value } => {
                BatchReply::Removed(self.lrem(&key, count, &value))
            }
        }
    }
}

/// In-process [`Store`] implementation.
///
/// Clones share the same underlying data, so a clone handed to another task
/// addresses the same lists.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    pushed: Arc<Notify>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| RqError::Store("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Batch = MemoryBatch;

    async fn llen(&self, key: &str) -> Result<usize> {
        Ok(self.state()?.llen(key))
    }

    async fn lpush(&self, key: &str, value: &[u8]) -> Result<usize> {
        let len = self.state()?.lpush(key, value.to_vec());
        self.pushed.notify_waiters();
        Ok(len)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        Ok(self.state()?.expire(key, ttl))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.state()?.ttl(key))
    }

    async fn rpoplpush(&self, src: &str, dst: &str) -> Result<Option<Vec<u8>>> {
        let value = self.state()?.rpoplpush(src, dst);
        if value.is_some() {
            self.pushed.notify_waiters();
        }
        Ok(value)
    }

    async fn brpoplpush(
        &self,
        src: &str,
        dst: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);

        loop {
            // Registered before the check so a push in between is not missed.
            let pushed = self.pushed.notified();

            if let Some(value) = self.rpoplpush(src, dst).await? {
                return Ok(Some(value));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, pushed).await.is_err() {
                        return Ok(None);
                    }
                }
                None => pushed.await,
            }
        }
    }

    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize> {
        Ok(self.state()?.lrem(key, count, value))
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>> {
        Ok(self.state()?.lrange(key, start, stop))
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut state = self.state()?;
        state.evict_expired(key);
        Ok(state.remove(key))
    }

    fn batch(&self) -> Self::Batch {
        MemoryBatch::default()
    }

    async fn commit(&self, batch: Self::Batch) -> Result<Vec<BatchReply>> {
        let replies = {
            let mut state = self.state()?;
            batch
                .commands
                .into_iter()
                .map(|command| state.apply(command))
                .collect::<Vec<_>>()
        };
        self.pushed.notify_waiters();
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lpush_and_llen() {
        let store = MemoryStore::new();
        assert_eq!(store.llen("list").await.unwrap(), 0);
        assert_eq!(store.lpush("list", b"a").await.unwrap(), 1);
        assert_eq!(store.lpush("list", b"b").await.unwrap(), 2);
        assert_eq!(store.llen("list").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lrange_head_first() {
        let store = MemoryStore::new();
        for v in [b"a", b"b", b"c"] {
            store.lpush("list", v).await.unwrap();
        }
        let all = store.lrange("list", 0, -1).await.unwrap();
        assert_eq!(all, vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]);
        assert_eq!(store.lrange("list", -1, -1).await.unwrap(), vec![b"a".to_vec()]);
        assert_eq!(store.lrange("list", 1, 10).await.unwrap().len(), 2);
        assert!(store.lrange("list", 5, 10).await.unwrap().is_empty());
        assert!(store.lrange("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rpoplpush_moves_tail_to_head() {
        let store = MemoryStore::new();
        store.lpush("src", b"first").await.unwrap();
        store.lpush("src", b"second").await.unwrap();
        store.lpush("dst", b"existing").await.unwrap();

        let moved = store.rpoplpush("src", "dst").await.unwrap();
        assert_eq!(moved.as_deref(), Some(&b"first"[..]));
        assert_eq!(store.lrange("src", 0, -1).await.unwrap(), vec![b"second".to_vec()]);
        assert_eq!(
            store.lrange("dst", 0, -1).await.unwrap(),
            vec![b"first".to_vec(), b"existing".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_rpoplpush_empty_source() {
        let store = MemoryStore::new();
        assert!(store.rpoplpush("src", "dst").await.unwrap().is_none());
        assert_eq!(store.llen("dst").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rpoplpush_same_list_rotates() {
        let store = MemoryStore::new();
        store.lpush("ring", b"a").await.unwrap();
        store.lpush("ring", b"b").await.unwrap();
        let moved = store.rpoplpush("ring", "ring").await.unwrap();
        assert_eq!(moved.as_deref(), Some(&b"a"[..]));
        assert_eq!(
            store.lrange("ring", 0, -1).await.unwrap(),
            vec![b"a".to_vec(), b"b".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_lrem_directions() {
        let store = MemoryStore::new();
        // head -> tail: x a x b x
        for v in [b"x", b"b", b"x", b"a", b"x"] {
            store.lpush("list", v).await.unwrap();
        }

        assert_eq!(store.lrem("list", 1, b"x").await.unwrap(), 1);
        assert_eq!(
            store.lrange("list", 0, -1).await.unwrap(),
            vec![b"a".to_vec(), b"x".to_vec(), b"b".to_vec(), b"x".to_vec()]
        );

        assert_eq!(store.lrem("list", -1, b"x").await.unwrap(), 1);
        assert_eq!(
            store.lrange("list", 0, -1).await.unwrap(),
            vec![b"a".to_vec(), b"x".to_vec(), b"b".to_vec()]
        );

        store.lpush("list", b"x").await.unwrap();
        assert_eq!(store.lrem("list", 0, b"x").await.unwrap(), 2);
        assert_eq!(store.lrem("list", 1, b"missing").await.unwrap(), 0);
        assert_eq!(store.llen("list").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_list_is_removed() {
        let store = MemoryStore::new();
        store.lpush("list", b"a").await.unwrap();
        store.expire("list", Duration::from_secs(60)).await.unwrap();
        store.lrem("list", 1, b"a").await.unwrap();

        assert!(!store.del("list").await.unwrap());
        assert!(store.ttl("list").await.unwrap().is_none());
        assert!(!store.expire("list", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_and_ttl() {
        let store = MemoryStore::new();
        store.lpush("list", b"a").await.unwrap();
        assert!(store.ttl("list").await.unwrap().is_none());

        assert!(store.expire("list", Duration::from_secs(10)).await.unwrap());
        assert_eq!(store.ttl("list").await.unwrap(), Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.ttl("list").await.unwrap(), Some(Duration::from_secs(6)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.llen("list").await.unwrap(), 0);
        assert!(store.ttl("list").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lpush_after_expiry_starts_fresh() {
        let store = MemoryStore::new();
        store.lpush("list", b"old").await.unwrap();
        store.expire("list", Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.lpush("list", b"new").await.unwrap(), 1);
        assert!(store.ttl("list").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_brpoplpush_times_out() {
        let store = MemoryStore::new();
        let started = Instant::now();
        let value = store
            .brpoplpush("src", "dst", Duration::from_secs(2))
            .await
            .unwrap();
        assert!(value.is_none());
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_brpoplpush_wakes_on_push() {
        let store = MemoryStore::new();
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .brpoplpush("src", "dst", Duration::from_secs(30))
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.lpush("src", b"hello").await.unwrap();

        let value = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter should wake before its own timeout")
            .unwrap();
        assert_eq!(value.as_deref(), Some(&b"hello"[..]));
        assert_eq!(store.llen("dst").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_applies_batch() {
        let store = MemoryStore::new();
        let mut batch = store.batch();
        batch.lpush("list", b"a");
        batch.lpush("list", b"b");
        batch.expire("list", Duration::from_secs(30));
        assert_eq!(batch.len(), 3);

        assert_eq!(store.llen("list").await.unwrap(), 0);
        let replies = store.commit(batch).await.unwrap();
        assert_eq!(
            replies,
            vec![
                BatchReply::Len(1),
                BatchReply::Len(2),
                BatchReply::Expired(true),
            ]
        );

        assert_eq!(store.llen("list").await.unwrap(), 2);
        assert!(store.ttl("list").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_returns_replies_in_order() {
        let store = MemoryStore::new();
        store.lpush("src", b"job").await.unwrap();

        let mut batch = store.batch();
        batch.rpoplpush("src", "dst");
        batch.rpoplpush("src", "dst");
        batch.lrem("dst", 1, b"job");
        batch.expire("missing", Duration::from_secs(1));

        let replies = store.commit(batch).await.unwrap();
        assert_eq!(
            replies,
            vec![
                BatchReply::Value(Some(b"job".to_vec())),
                BatchReply::Value(None),
                BatchReply::Removed(1),
                BatchReply::Expired(false),
            ]
        );
        assert_eq!(store.llen("dst").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_empty_batch() {
        let store = MemoryStore::new();
        assert!(store.commit(store.batch()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.lpush("list", b"a").await.unwrap();
        assert_eq!(other.llen("list").await.unwrap(), 1);
    }
}
