//! Deferred effects: outcome deltas computed at action time.
//!
//! An effect is rolled the moment the player acts, so outcome randomness
//! stays reproducible regardless of how long narration takes. Only its
//! *application* to live state is deferred.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::meters::MeterKind;

/// How well an action turned out. Used both for payout selection and as
/// narration context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTier {
    /// Beyond expectations.
    Triumph,
    /// Went as planned.
    Success,
    /// Went wrong, recoverably.
    Setback,
    /// Went badly wrong.
    Disaster,
}

impl fmt::Display for OutcomeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triumph => write!(f, "triumph"),
            Self::Success => write!(f, "success"),
            Self::Setback => write!(f, "setback"),
            Self::Disaster => write!(f, "disaster"),
        }
    }
}

/// Signed deltas to fold into live state on commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDeltas {
    meters: BTreeMap<MeterKind, i32>,
    score: i64,
    funds: i64,
}

impl EffectDeltas {
    /// Deltas that change nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the delta for one meter.
    pub fn with_meter(mut self, kind: MeterKind, delta: i32) -> Self {
        self.meters.insert(kind, delta);
        self
    }

    /// Set the score delta.
    pub fn with_score(mut self, delta: i64) -> Self {
        self.score = delta;
        self
    }

    /// Set the funds delta.
    pub fn with_funds(mut self, delta: i64) -> Self {
        self.funds = delta;
        self
    }

    /// Per-meter deltas.
    pub fn meters(&self) -> &BTreeMap<MeterKind, i32> {
        &self.meters
    }

    /// Score delta.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Funds delta.
    pub fn funds(&self) -> i64 {
        self.funds
    }

    /// Sum another set of deltas into this one. Accumulation is always
    /// explicit; the ledger never does this silently.
    pub fn merge(mut self, other: &Self) -> Self {
        for (&kind, &delta) in &other.meters {
            *self.meters.entry(kind).or_insert(0) += delta;
        }
        self.score += other.score;
        self.funds += other.funds;
        self
    }
}

/// A computed-but-not-yet-applied outcome, keyed by action in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredEffect {
    /// The state deltas to apply on commit.
    pub deltas: EffectDeltas,
    /// Outcome tier, if the action had one.
    pub tier: Option<OutcomeTier>,
    /// Short subject line, reused for the memo thread and narration context.
    pub subject: String,
    /// Longer description of what happened, used as narration context.
    pub description: String,
}

impl DeferredEffect {
    /// Create an effect with the given deltas and no outcome tier.
    pub fn new(deltas: EffectDeltas, subject: impl Into<String>) -> Self {
        Self {
            deltas,
            tier: None,
            subject: subject.into(),
            description: String::new(),
        }
    }

    /// Set the outcome tier.
    pub fn with_tier(mut self, tier: OutcomeTier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Set the descriptive context text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
