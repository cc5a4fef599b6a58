//! The narration job queue.
//!
//! A priority-ordered list drained by exactly one background worker, because
//! the underlying generation capability does not tolerate overlapping
//! requests. The queue is process-scoped for the session: handles are cheap
//! clones, and it survives game-state resets unless explicitly flushed.
//!
//! Concurrency: `enqueue` may run on the game-logic thread while the worker
//! runs in the background; the pending list and draining flag live behind a
//! single mutex. Completions for ledger-routed jobs are marshaled back to
//! the game-state thread over a channel; the worker never mutates game
//! state directly.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use memo_core::ActionKey;

use crate::config::QueueConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::events::{PipelineEvent, PipelineEventLog};
use crate::job::{CompletionRoute, NarrationJob};
use crate::narrator::Narrator;

/// A finished ledger-routed job, delivered to the game-state thread.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The action whose narration finished.
    pub key: ActionKey,
    /// The narration text. Empty on definitive failure.
    pub text: String,
    /// Whether generation produced non-empty text.
    pub succeeded: bool,
}

struct QueueState {
    pending: Vec<NarrationJob>,
    draining: bool,
    shutdown: bool,
    next_order: u64,
}

struct Inner {
    state: Mutex<QueueState>,
    wake: Condvar,
    completions: Sender<Completion>,
    receiver: Mutex<Option<Receiver<Completion>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    events: Mutex<PipelineEventLog>,
    config: QueueConfig,
}

impl Inner {
    fn record(&self, event: PipelineEvent) {
        self.events.lock().expect("event log lock").record(event);
    }
}

/// Handle to the session's narration queue. Clones share one queue.
#[derive(Clone)]
pub struct NarrationQueue {
    inner: Arc<Inner>,
}

impl NarrationQueue {
    /// Create a stopped queue. Call [`NarrationQueue::start`] to begin
    /// draining and [`NarrationQueue::take_completions`] to receive
    /// ledger-routed results.
    pub fn new(config: QueueConfig) -> Self {
        let (tx, rx) = channel();
        let max_events = config.max_events;
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    pending: Vec::new(),
                    draining: false,
                    shutdown: false,
                    next_order: 0,
                }),
                wake: Condvar::new(),
                completions: tx,
                receiver: Mutex::new(Some(rx)),
                worker: Mutex::new(None),
                events: Mutex::new(PipelineEventLog::new(max_events)),
                config,
            }),
        }
    }

    /// Take the completion receiver. The single consumer (the game-state
    /// owner) drains it; taking twice returns `None`.
    pub fn take_completions(&self) -> Option<Receiver<Completion>> {
        self.inner.receiver.lock().expect("receiver lock").take()
    }

    /// Spawn the worker thread. Jobs enqueued earlier start draining
    /// immediately. Errors if the worker is already running.
    pub fn start(&self, narrator: Box<dyn Narrator>) -> PipelineResult<()> {
        let mut worker = self.inner.worker.lock().expect("worker handle lock");
        if worker.is_some() {
            return Err(PipelineError::WorkerAlreadyStarted);
        }
        let inner = Arc::clone(&self.inner);
        let handle = std::thread::Builder::new()
            .name("narration-worker".to_string())
            .spawn(move || worker_loop(&inner, narrator))?;
        *worker = Some(handle);
        Ok(())
    }

    /// Insert a job, keeping the pending list sorted by priority class
    /// (stable: ties stay in insertion order) and waking the worker if it
    /// is idle. A job whose request ID is already queued is a programming
    /// error: rejected loudly in debug builds, dropped quietly in release.
    pub fn enqueue(&self, mut job: NarrationJob) {
        let duplicate = {
            let mut state = self.inner.state.lock().expect("queue state lock");
            if state.shutdown {
                return;
            }
            if state.pending.iter().any(|j| j.id == job.id) {
                self.inner.record(PipelineEvent::DuplicateDropped { id: job.id });
                true
            } else {
                job.order = state.next_order;
                state.next_order += 1;
                self.inner.record(PipelineEvent::Enqueued {
                    id: job.id,
                    priority: job.priority,
                });
                state.pending.push(job);
                state.pending.sort_by_key(|j| (j.priority, j.order));
                false
            }
        };
        // Outside the lock so a debug panic cannot poison the queue state.
        debug_assert!(!duplicate, "duplicate narration request id enqueued");
        if !duplicate {
            self.inner.wake.notify_one();
        }
    }

    /// Clear the pending list. Does not touch the in-flight job; only safe
    /// at session teardown or an explicit game-state reset.
    pub fn flush(&self) {
        let dropped = {
            let mut state = self.inner.state.lock().expect("queue state lock");
            let dropped = state.pending.len();
            state.pending.clear();
            dropped
        };
        self.inner.record(PipelineEvent::Flushed { dropped });
    }

    /// Stop the worker after its current job, discard pending jobs, and
    /// join the thread. The queue cannot be restarted.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().expect("queue state lock");
            state.shutdown = true;
            state.pending.clear();
        }
        self.inner.wake.notify_all();
        let handle = self.inner.worker.lock().expect("worker handle lock").take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Whether the worker is processing a job or jobs are waiting.
    pub fn is_draining(&self) -> bool {
        let state = self.inner.state.lock().expect("queue state lock");
        state.draining || !state.pending.is_empty()
    }

    /// Number of jobs waiting (not counting the in-flight job).
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().expect("queue state lock").pending.len()
    }

    /// Snapshot of the pipeline event log.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.inner
            .events
            .lock()
            .expect("event log lock")
            .events()
            .to_vec()
    }

    pub(crate) fn record(&self, event: PipelineEvent) {
        self.inner.record(event);
    }
}

impl std::fmt::Debug for NarrationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock().expect("queue state lock");
        f.debug_struct("NarrationQueue")
            .field("pending", &state.pending.len())
            .field("draining", &state.draining)
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

fn worker_loop(inner: &Inner, narrator: Box<dyn Narrator>) {
    loop {
        // Idle until a job is available, or exit on shutdown.
        let job = {
            let mut state = inner.state.lock().expect("queue state lock");
            loop {
                if state.shutdown {
                    return;
                }
                if !state.pending.is_empty() {
                    // Removed the instant it is dispatched: no duplicate
                    // dispatch is possible.
                    let job = state.pending.remove(0);
                    state.draining = true;
                    break job;
                }
                state = inner.wake.wait(state).expect("queue state lock");
            }
        };

        if !narrator.ready() {
            inner.record(PipelineEvent::NotReady { id: job.id });
            requeue(inner, job);
            backoff(inner);
            continue;
        }

        inner.record(PipelineEvent::Dispatched {
            id: job.id,
            kind: job.kind,
        });

        // A generation error or panic is the same terminal failure as empty
        // text. It never propagates and never stalls the queue.
        let text = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            narrator.generate(job.kind, &job.context)
        }))
        .unwrap_or_else(|_| Ok(String::new()))
        .unwrap_or_default();
        let succeeded = !text.is_empty();
        inner.record(PipelineEvent::Completed {
            id: job.id,
            succeeded,
        });

        match job.route {
            CompletionRoute::Callback(callback) => callback(text),
            CompletionRoute::Ledger(key) => {
                // The receiver may be gone during teardown; dropping the
                // completion is correct then.
                let _ = inner.completions.send(Completion {
                    key,
                    text,
                    succeeded,
                });
            }
        }

        inner.state.lock().expect("queue state lock").draining = false;
        // Loop immediately: the next queued job dispatches regardless of
        // this one's outcome.
    }
}

/// Put a not-ready job back, keeping its original order so it stays at the
/// head of its priority class.
fn requeue(inner: &Inner, job: NarrationJob) {
    let mut state = inner.state.lock().expect("queue state lock");
    state.pending.push(job);
    state.pending.sort_by_key(|j| (j.priority, j.order));
    state.draining = false;
}

/// Sleep out the retry backoff without busy-looping. Wakes early only for
/// shutdown; enqueue notifications do not shorten the wait.
fn backoff(inner: &Inner) {
    let deadline = Instant::now() + inner.config.retry_backoff;
    let mut state = inner.state.lock().expect("queue state lock");
    loop {
        if state.shutdown {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        let (guard, _) = inner
            .wake
            .wait_timeout(state, deadline - now)
            .expect("queue state lock");
        state = guard;
    }
}
