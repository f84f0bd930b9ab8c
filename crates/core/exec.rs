//! Execution context for queue operations.

/// Where a queue operation runs.
#[derive(Debug)]
pub enum Exec<'a, B> {
    /// Run against the store right away.
    Immediate,
    /// Append to a caller-owned batch. The caller commits it.
    Batched(&'a mut B),
}

impl<B> Default for Exec<'_, B> {
    fn default() -> Self {
        Self::Immediate
    }
}

impl<'a, B> Exec<'a, B> {
    /// Shorthand for [`Exec::Batched`].
    pub fn batched(batch: &'a mut B) -> Self {
        Self::Batched(batch)
    }
}

/// Outcome of an operation issued through an [`Exec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// The operation ran and produced a result.
    Ready(T),
    /// The operation was recorded in a batch. Its result is the reply at
    /// this index of the `Vec` returned by commit.
    Queued(usize),
}

impl<T> Reply<T> {
    /// The result, if the operation already ran.
    pub fn ready(self) -> Option<T> {
        match self {
            Reply::Ready(value) => Some(value),
            Reply::Queued(_) => None,
        }
    }

    /// Index of the operation's first reply in the committed batch.
    pub fn queued(&self) -> Option<usize> {
        match self {
            Reply::Ready(_) => None,
            Reply::Queued(index) => Some(*index),
        }
    }

    /// Whether the operation was deferred to a batch.
    pub fn is_queued(&self) -> bool {
        matches!(self, Reply::Queued(_))
    }
}
