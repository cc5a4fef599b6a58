//! Pipeline tuning knobs.
//!
//! Everything here is a perception or scheduling constant, not a semantic
//! contract: changing a value must never break the ordering or
//! commit-only-on-completion invariants.

use std::time::Duration;

/// Configuration for the narration queue worker.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long the worker sleeps after the generation capability reports
    /// not-ready, before retrying the head job.
    pub retry_backoff: Duration,
    /// Maximum pipeline events retained (0 = unlimited).
    pub max_events: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_secs(2),
            max_events: 256,
        }
    }
}

impl QueueConfig {
    /// Set the not-ready retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Configuration for pending-action progress views.
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Progress value the view approaches while narration is outstanding.
    pub soft_cap: f64,
    /// Wall-clock seconds a "normal" action takes to reach the soft cap.
    pub normal_duration: f64,
    /// Progress per second once a response has arrived, so completion feels
    /// immediate.
    pub sprint_rate: f64,
    /// Seconds after which an action with no response completes through the
    /// templated-fallback path.
    pub fallback_after: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            soft_cap: 95.0,
            normal_duration: 60.0,
            sprint_rate: 60.0,
            fallback_after: 180.0,
        }
    }
}

/// Configuration for the interrupt trigger.
#[derive(Debug, Clone)]
pub struct InterruptConfig {
    /// Seconds between trigger checks.
    pub interval: f64,
    /// Probability (0-1) that a check fires an interrupt.
    pub probability: f64,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            interval: 45.0,
            probability: 0.08,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Queue worker settings.
    pub queue: QueueConfig,
    /// Progress view settings.
    pub progress: ProgressConfig,
    /// Interrupt trigger settings.
    pub interrupt: InterruptConfig,
    /// RNG seed for reproducible interrupt rolls.
    pub seed: u64,
}

impl PipelineConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the queue worker settings.
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Set the progress view settings.
    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    /// Set the interrupt trigger settings.
    pub fn with_interrupt(mut self, interrupt: InterruptConfig) -> Self {
        self.interrupt = interrupt;
        self
    }
}
