//! Pipeline observability.
//!
//! A bounded log of typed events recording what the scheduler did: every
//! enqueue, retry, dispatch, failure, fallback, and commit. Failures land
//! here instead of propagating; nothing in the pipeline is allowed to crash
//! the session.

use memo_core::ActionKey;

use crate::job::{JobKind, Priority, RequestId};

/// Something the pipeline did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A job entered the queue.
    Enqueued {
        /// The job's request ID.
        id: RequestId,
        /// Its priority class.
        priority: Priority,
    },
    /// An enqueue was dropped because its request ID was already queued.
    DuplicateDropped {
        /// The offending request ID.
        id: RequestId,
    },
    /// The generation capability was not ready; the head job was re-queued.
    NotReady {
        /// The job that was re-queued.
        id: RequestId,
    },
    /// A job was handed to the generation capability.
    Dispatched {
        /// The dispatched job.
        id: RequestId,
        /// Its narration flavor.
        kind: JobKind,
    },
    /// A job finished, successfully or not.
    Completed {
        /// The finished job.
        id: RequestId,
        /// Whether generation produced non-empty text.
        succeeded: bool,
    },
    /// A pending action was committed with templated fallback text.
    FallbackUsed {
        /// The action that fell back.
        key: ActionKey,
    },
    /// A ledger entry was applied and its memo thread revealed.
    Committed {
        /// The committed action.
        key: ActionKey,
        /// Whether a ledger entry existed (false on a benign double commit).
        applied: bool,
    },
    /// The interrupt trigger fired.
    InterruptFired {
        /// The synthesized action's key.
        key: ActionKey,
    },
    /// The pending list was cleared at session teardown.
    Flushed {
        /// Number of jobs discarded.
        dropped: usize,
    },
}

/// Bounded accumulator of pipeline events.
#[derive(Debug, Default)]
pub struct PipelineEventLog {
    events: Vec<PipelineEvent>,
    max_events: usize,
}

impl PipelineEventLog {
    /// Create a log with the given capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest if over capacity.
    pub fn record(&mut self, event: PipelineEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// All recorded events.
    pub fn events(&self) -> &[PipelineEvent] {
        &self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
