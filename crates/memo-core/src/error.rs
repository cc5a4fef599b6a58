//! Error types for the core state model.

use thiserror::Error;

use crate::ids::ThreadId;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while manipulating core game state.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced thread does not exist in the inbox.
    #[error("unknown thread: {0}")]
    UnknownThread(ThreadId),

    /// The thread's placeholder body has already been filled in.
    #[error("body already filled for thread {0}")]
    BodyAlreadyFilled(ThreadId),

    /// The thread has no messages to operate on.
    #[error("thread {0} has no messages")]
    EmptyThread(ThreadId),
}
