//! Error types for the narration pipeline.

use thiserror::Error;

use memo_core::CoreError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur in the narration pipeline.
///
/// None of these are fatal to a session: the worst user-visible outcome of
/// any pipeline failure is a memo written from a fallback template.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `start` was called on a queue whose worker is already running.
    #[error("narration worker already started")]
    WorkerAlreadyStarted,

    /// The completion receiver was already handed out.
    #[error("completion receiver already taken")]
    CompletionsTaken,

    /// The worker thread could not be spawned.
    #[error("failed to spawn narration worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// A phase-advancing command was issued while an interrupt is pending.
    #[error("an interrupt is awaiting resolution")]
    InterruptPending,

    /// Core state error.
    #[error(transparent)]
    Core(#[from] CoreError),
}
