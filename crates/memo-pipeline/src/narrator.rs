//! The generation capability seam.
//!
//! The pipeline treats narration as a black box behind the [`Narrator`]
//! trait: it may be slow, it may not be ready yet, and it may fail. The
//! worker calls it at most once concurrently.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::job::{JobContext, JobKind};

/// Errors from the generation capability. Treated identically to an empty
/// result: terminal for that job, never fatal to the pipeline.
#[derive(Debug, Error)]
pub enum NarrateError {
    /// The backend reported a failure.
    #[error("generation failed: {0}")]
    Failed(String),
}

/// An external narration capability.
pub trait Narrator: Send {
    /// Whether the capability can accept a request right now. While this
    /// returns `false` the worker re-queues the head job and backs off.
    fn ready(&self) -> bool;

    /// Produce narration text for a job. An empty string or an error both
    /// signal definitive failure for the job; there is no partial or
    /// streaming contract at this layer.
    fn generate(&self, kind: JobKind, context: &JobContext) -> Result<String, NarrateError>;
}

/// A deterministic narrator for tests and offline play: responses come from
/// a pre-loaded script, with an optional countdown of not-ready checks.
#[derive(Debug, Default)]
pub struct ScriptedNarrator {
    responses: Mutex<VecDeque<Result<String, NarrateError>>>,
    not_ready: AtomicUsize,
    ready_checks: AtomicUsize,
    dispatches: AtomicUsize,
}

impl ScriptedNarrator {
    /// A narrator that is always ready and answers every request with a
    /// fixed stock line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_text(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .expect("narrator script lock")
            .push_back(Ok(text.into()));
    }

    /// Queue a failure response.
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.responses
            .lock()
            .expect("narrator script lock")
            .push_back(Err(NarrateError::Failed(reason.into())));
    }

    /// Report not-ready for the next `n` readiness checks.
    pub fn set_not_ready(&self, n: usize) {
        self.not_ready.store(n, Ordering::SeqCst);
    }

    /// How many times `ready()` has been called.
    pub fn ready_checks(&self) -> usize {
        self.ready_checks.load(Ordering::SeqCst)
    }

    /// How many times `generate()` has been called.
    pub fn dispatches(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }
}

impl Narrator for ScriptedNarrator {
    fn ready(&self) -> bool {
        self.ready_checks.fetch_add(1, Ordering::SeqCst);
        self.not_ready
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }

    fn generate(&self, kind: JobKind, context: &JobContext) -> Result<String, NarrateError> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .expect("narrator script lock")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(format!(
                    "The clerk files a terse {kind} report on '{}'.",
                    context.subject
                ))
            })
    }
}

impl Narrator for std::sync::Arc<ScriptedNarrator> {
    fn ready(&self) -> bool {
        self.as_ref().ready()
    }

    fn generate(&self, kind: JobKind, context: &JobContext) -> Result<String, NarrateError> {
        self.as_ref().generate(kind, context)
    }
}
