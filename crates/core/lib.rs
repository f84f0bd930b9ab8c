//! # rqueue-core - Reliable queue over a list store
//!
//! This crate provides the storage-agnostic pieces of rqueue:
//! - `ReliableQueue`, the access/process two-list handoff
//! - `Store` and `Batch` traits for the key-value store it runs on
//! - `Exec` and `Reply` for running operations now or inside a caller's batch
//! - `QueueName`, `QueueKeys` and `QueueConfig`
//! - `MemoryStore`, an in-process store with Redis list semantics
//! - Error types
//!
//! ## Usage
//!
//! ```rust
//! use rqueue_core::{Exec, MemoryStore, QueueName, ReliableQueue};
//!
//! #[tokio::main]
//! async fn main() -> rqueue_core::Result<()> {
//!     let queue = ReliableQueue::new(QueueName::new("emails")?, MemoryStore::new(), None)?;
//!
//!     queue.push("welcome:42", Exec::Immediate).await?;
//!
//!     if let Some(value) = queue.pop(Exec::Immediate).await?.ready().flatten() {
//!         // ... process ...
//!         queue.ack(&value, Exec::Immediate).await?;
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod exec;
mod keys;
mod memory;
mod queue;
mod store;

// Re-export main types
pub use config::{QueueConfig, QueueConfigBuilder};
pub use error::{Result, RqError};
pub use exec::{Exec, Reply};
pub use keys::{QueueKeys, QueueName, NAMESPACE};
pub use memory::{MemoryBatch, MemoryStore};
pub use queue::ReliableQueue;
pub use store::{Batch, BatchReply, Store};
