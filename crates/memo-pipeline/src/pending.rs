//! Pending-action progress views.
//!
//! Purely a perceptual smoothing layer, never gameplay-authoritative: the
//! player sees steady progress on each in-flight action even though the
//! underlying commit is atomic and instantaneous. Progress creeps toward a
//! soft cap on a fixed wall-clock schedule, stalls there until narration
//! responds, then sprints to 100.

use memo_core::ActionKey;

use crate::config::ProgressConfig;
use crate::job::JobKind;

/// Flavor phase shown for an in-flight action, keyed off progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Orders being drafted.
    Dispatching,
    /// The action is underway.
    InTheField,
    /// Results are being written up.
    Reporting,
    /// Paperwork is being finalized.
    Finalizing,
    /// At the soft cap with no response yet.
    AwaitingWord,
    /// Response arrived and progress hit 100.
    Done,
}

impl std::fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatching => write!(f, "dispatching orders"),
            Self::InTheField => write!(f, "in the field"),
            Self::Reporting => write!(f, "compiling reports"),
            Self::Finalizing => write!(f, "finalizing paperwork"),
            Self::AwaitingWord => write!(f, "awaiting word"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Perception state for one in-flight action.
#[derive(Debug, Clone)]
pub struct PendingAction {
    key: ActionKey,
    kind: JobKind,
    elapsed: f64,
    progress: f64,
    has_response: bool,
    succeeded: bool,
}

impl PendingAction {
    /// Create a fresh view for an action entering the pipeline.
    pub fn new(key: ActionKey, kind: JobKind) -> Self {
        Self {
            key,
            kind,
            elapsed: 0.0,
            progress: 0.0,
            has_response: false,
            succeeded: false,
        }
    }

    /// The action this view tracks.
    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    /// The narration flavor requested for this action.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Whether this view belongs to an interrupt.
    pub fn is_interrupt(&self) -> bool {
        matches!(self.kind, JobKind::InterruptOpen | JobKind::InterruptResolve)
    }

    /// Current progress, 0-100.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Seconds since the action entered the pipeline.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Whether the completion callback has fired.
    pub fn has_response(&self) -> bool {
        self.has_response
    }

    /// Whether the response carried real narration (vs. fallback).
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Record the completion callback. Set exactly once; later calls are
    /// ignored so racing double commits cannot flip the outcome.
    pub fn mark_response(&mut self, succeeded: bool) {
        if self.has_response {
            return;
        }
        self.has_response = true;
        self.succeeded = succeeded;
    }

    /// Advance the view by `dt` seconds of wall-clock time.
    ///
    /// Before a response: creep toward the soft cap at a rate targeting
    /// `normal_duration` seconds. After: sprint to 100. Never blocks or
    /// affects whether the commit happens.
    pub fn tick(&mut self, dt: f64, config: &ProgressConfig) {
        self.elapsed += dt;
        if self.has_response {
            self.progress = (self.progress + config.sprint_rate * dt).min(100.0);
        } else {
            let rate = config.soft_cap / config.normal_duration;
            self.progress = (self.progress + rate * dt).min(config.soft_cap);
        }
    }

    /// Whether the view can be destroyed: progress hit 100 and the response
    /// arrived.
    pub fn is_finished(&self) -> bool {
        self.has_response && self.progress >= 100.0
    }

    /// Whether the action has waited past the fallback deadline with no
    /// response.
    pub fn is_overdue(&self, config: &ProgressConfig) -> bool {
        !self.has_response && self.elapsed >= config.fallback_after
    }

    /// The flavor phase to display.
    pub fn phase(&self, config: &ProgressConfig) -> ProgressPhase {
        if self.is_finished() {
            return ProgressPhase::Done;
        }
        if !self.has_response && self.progress >= config.soft_cap {
            return ProgressPhase::AwaitingWord;
        }
        match self.progress {
            p if p < 25.0 => ProgressPhase::Dispatching,
            p if p < 50.0 => ProgressPhase::InTheField,
            p if p < 75.0 => ProgressPhase::Reporting,
            _ => ProgressPhase::Finalizing,
        }
    }
}
