//! Narration jobs: the unit of work the serial worker processes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use memo_core::{ActionKey, OutcomeTier};

/// Unique identifier for a narration request.
///
/// Identity is unique across the live queue; a duplicate enqueue is a
/// programming error (asserted in debug builds, dropped in release).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Priority class for narration jobs. Lower sorts first: the worker drains
/// all `High` jobs before any `Normal`, and `Normal` before `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Interrupts and anything gating the player.
    High,
    /// Ordinary action results.
    Normal,
    /// Background flavor.
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Which narration flavor to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// The outcome memo for a player action.
    Result,
    /// The memo that opens an interrupt.
    InterruptOpen,
    /// The memo that resolves an interrupt.
    InterruptResolve,
    /// A freeform reply to the player.
    FreeformReply,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Result => write!(f, "result"),
            Self::InterruptOpen => write!(f, "interrupt-open"),
            Self::InterruptResolve => write!(f, "interrupt-resolve"),
            Self::FreeformReply => write!(f, "freeform-reply"),
        }
    }
}

/// Context handed to the generation capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    /// Subject line of the action or event.
    pub subject: String,
    /// Longer description of what happened.
    pub description: String,
    /// Outcome tier, if the action had one.
    pub tier: Option<OutcomeTier>,
    /// Extra key/value context pairs.
    pub extra: BTreeMap<String, String>,
}

impl JobContext {
    /// Create context with a subject line.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the outcome tier.
    pub fn with_tier(mut self, tier: OutcomeTier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Add an extra key/value pair.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Where a finished job's text goes.
pub enum CompletionRoute {
    /// Route through the pending-action map: the orchestrator commits the
    /// ledger entry for this key and reveals its memo thread.
    Ledger(ActionKey),
    /// Invoke a direct callback on the worker thread. The callback is
    /// removed from the job atomically with invocation, so it runs exactly
    /// once. An empty string signals definitive failure.
    Callback(Box<dyn FnOnce(String) + Send>),
}

impl fmt::Debug for CompletionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ledger(key) => f.debug_tuple("Ledger").field(key).finish(),
            Self::Callback(_) => f.debug_tuple("Callback").finish(),
        }
    }
}

/// A narration request waiting in (or popped from) the queue.
#[derive(Debug)]
pub struct NarrationJob {
    /// Request identity.
    pub id: RequestId,
    /// Narration flavor.
    pub kind: JobKind,
    /// Priority class.
    pub priority: Priority,
    /// Generation context.
    pub context: JobContext,
    /// Completion routing.
    pub route: CompletionRoute,
    pub(crate) order: u64,
}

impl NarrationJob {
    /// Create a job whose completion commits the ledger entry for `key`.
    pub fn for_action(key: ActionKey, kind: JobKind, priority: Priority, context: JobContext) -> Self {
        Self {
            id: RequestId::new(),
            kind,
            priority,
            context,
            route: CompletionRoute::Ledger(key),
            order: 0,
        }
    }

    /// Create a job with a direct completion callback and no ledger key.
    pub fn with_callback(
        kind: JobKind,
        priority: Priority,
        context: JobContext,
        callback: impl FnOnce(String) + Send + 'static,
    ) -> Self {
        Self {
            id: RequestId::new(),
            kind,
            priority,
            context,
            route: CompletionRoute::Callback(Box::new(callback)),
            order: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_sorts_high_first() {
        let mut priorities = vec![Priority::Low, Priority::High, Priority::Normal];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::High, Priority::Normal, Priority::Low]
        );
    }

    #[test]
    fn context_builder() {
        let ctx = JobContext::new("Audit")
            .with_description("The audit closed.")
            .with_tier(OutcomeTier::Success)
            .with_extra("district", "harbor");
        assert_eq!(ctx.subject, "Audit");
        assert_eq!(ctx.tier, Some(OutcomeTier::Success));
        assert_eq!(ctx.extra["district"], "harbor");
    }

    #[test]
    fn request_ids_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn job_for_action_routes_to_ledger() {
        let job = NarrationJob::for_action(
            ActionKey::from("card1"),
            JobKind::Result,
            Priority::Normal,
            JobContext::new("Audit"),
        );
        assert!(matches!(job.route, CompletionRoute::Ledger(ref k) if k.as_str() == "card1"));
    }

    #[test]
    fn context_serde_roundtrip() {
        let ctx = JobContext::new("Audit").with_tier(OutcomeTier::Setback);
        let json = serde_json::to_string(&ctx).unwrap();
        let ctx2: JobContext = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx, ctx2);
    }
}
