//! The asynchronous narration pipeline for Memoranda.
//!
//! Gameplay outcomes are computed the moment the player acts, but nothing is
//! shown or committed until narration for the outcome exists. This crate
//! owns that gap: a priority-ordered serial queue feeding an external
//! [`Narrator`], pending-action progress views, an interrupt trigger, and
//! the [`Orchestrator`] that commits deferred effects and reveals memo
//! threads when narration completes (or falls back to template text when it
//! cannot).
//!
//! Threading model: one dedicated worker thread drains the queue; all game
//! state lives on the thread that owns the [`Orchestrator`], which pumps
//! completions over a channel. Direct callbacks run on the worker thread.

pub mod config;
pub mod error;
pub mod events;
pub mod fallback;
pub mod interrupt;
pub mod job;
pub mod narrator;
pub mod orchestrator;
pub mod pending;
pub mod queue;

pub use config::{InterruptConfig, PipelineConfig, ProgressConfig, QueueConfig};
pub use error::{PipelineError, PipelineResult};
pub use events::{PipelineEvent, PipelineEventLog};
pub use fallback::fallback_text;
pub use job::{CompletionRoute, JobContext, JobKind, NarrationJob, Priority, RequestId};
pub use narrator::{NarrateError, Narrator, ScriptedNarrator};
pub use orchestrator::Orchestrator;
pub use pending::{PendingAction, ProgressPhase};
pub use queue::{Completion, NarrationQueue};
