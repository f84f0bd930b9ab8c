//! Error types for the rqueue reliable queue.

use thiserror::Error;

/// The main error type for rqueue.
#[derive(Error, Debug)]
pub enum RqError {
    /// The store was unreachable or rejected a command.
    #[error("Store error: {0}")]
    Store(String),

    /// Queue name that would produce ambiguous or colliding keys.
    #[error("Invalid queue name: {0}")]
    InvalidQueueName(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using RqError.
pub type Result<T> = std::result::Result<T, RqError>;
