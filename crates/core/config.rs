//! Configuration types for a reliable queue.

use std::time::Duration;

use crate::error::{Result, RqError};
use crate::keys::QueueName;

/// Configuration for a ReliableQueue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue identity used to derive the list keys.
    pub name: QueueName,
    /// Expiry applied to the access list on every push. `None` disables expiry.
    pub ttl: Option<Duration>,
}

impl QueueConfig {
    /// Create a new QueueConfig without expiry.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: QueueName::new(name)?,
            ttl: None,
        })
    }

    /// Create a new builder.
    pub fn builder() -> QueueConfigBuilder {
        QueueConfigBuilder::new()
    }
}

/// Builder for QueueConfig.
#[derive(Debug, Default)]
pub struct QueueConfigBuilder {
    name: Option<String>,
    ttl: Option<Duration>,
}

impl QueueConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the queue name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the access list TTL.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Build the QueueConfig.
    pub fn build(self) -> Result<QueueConfig> {
        let name = self
            .name
            .ok_or_else(|| RqError::Config("queue name is required".to_string()))?;
        let name = QueueName::new(name)?;

        validate_ttl(self.ttl)?;

        Ok(QueueConfig {
            name,
            ttl: self.ttl,
        })
    }
}

/// Reject TTLs the store would round down to zero.
///
/// Expiry is set with millisecond precision, and a zero expiry deletes the
/// access list on the very push that set it.
pub(crate) fn validate_ttl(ttl: Option<Duration>) -> Result<()> {
    match ttl {
        Some(ttl) if ttl < Duration::from_millis(1) => Err(RqError::Config(format!(
            "ttl must be at least 1ms, got {:?}; leave it unset to disable expiry",
            ttl
        ))),
        _ => Ok(()),
    }
}
