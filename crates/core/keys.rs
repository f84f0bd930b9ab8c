//! Queue names and the store keys derived from them.

use std::fmt;

use crate::error::{Result, RqError};

/// Fixed prefix shared by every key rqueue creates.
pub const NAMESPACE: &str = "rqueue";

/// Separator between the role prefix and the queue name.
const DELIMITER: char = ':';

/// A validated queue identity.
///
/// Names are used verbatim in key derivation, so anything that could blur the
/// boundary between role and name is rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueName(String);

impl QueueName {
    /// Validate and wrap a queue name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RqError::InvalidQueueName(
                "queue name must not be empty".to_string(),
            ));
        }
        if name.contains(DELIMITER) {
            return Err(RqError::InvalidQueueName(format!(
                "queue name {:?} must not contain '{}'",
                name, DELIMITER
            )));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(RqError::InvalidQueueName(format!(
                "queue name {:?} must not contain whitespace or control characters",
                name
            )));
        }
        Ok(Self(name))
    }

    /// The raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for QueueName {
    type Error = RqError;

    fn try_from(name: &str) -> Result<Self> {
        Self::new(name)
    }
}

impl TryFrom<String> for QueueName {
    type Error = RqError;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

/// Derives the two list keys for a queue.
#[derive(Debug, Clone)]
pub struct QueueKeys {
    access: String,
    process: String,
}

impl QueueKeys {
    /// Build the keys for the given queue.
    pub fn new(name: &QueueName) -> Self {
        Self {
            access: format!("{}_access{}{}", NAMESPACE, DELIMITER, name),
            process: format!("{}_process{}{}", NAMESPACE, DELIMITER, name),
        }
    }

    /// Key for values waiting to be popped (LIST).
    pub fn access(&self) -> &str {
        &self.access
    }

    /// Key for values popped but not yet acknowledged (LIST).
    pub fn process(&self) -> &str {
        &self.process
    }
}
