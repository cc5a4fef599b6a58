//! Organization meters and cumulative counters.
//!
//! Meters are bounded gauges (0-100) describing the state of the bureau.
//! Score and funds are unbounded running totals. All mutation goes through
//! narrow setters so callers can treat a `Meters` value as a snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower bound for every meter.
pub const METER_MIN: i32 = 0;
/// Upper bound for every meter.
pub const METER_MAX: i32 = 100;

/// The bounded gauges tracked for the bureau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterKind {
    /// Staff morale.
    Morale,
    /// Public credibility of the bureau.
    Credibility,
    /// Operational efficiency.
    Efficiency,
    /// Attention from oversight bodies. High is bad.
    Scrutiny,
}

impl MeterKind {
    /// All meter kinds in canonical order.
    pub fn all() -> &'static [Self] {
        &[
            Self::Morale,
            Self::Credibility,
            Self::Efficiency,
            Self::Scrutiny,
        ]
    }
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morale => write!(f, "morale"),
            Self::Credibility => write!(f, "credibility"),
            Self::Efficiency => write!(f, "efficiency"),
            Self::Scrutiny => write!(f, "scrutiny"),
        }
    }
}

/// Snapshot of all bureau meters plus cumulative score and funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meters {
    meters: BTreeMap<MeterKind, i32>,
    score: i64,
    funds: i64,
}

impl Default for Meters {
    fn default() -> Self {
        let meters = MeterKind::all().iter().map(|&k| (k, 50)).collect();
        Self {
            meters,
            score: 0,
            funds: 0,
        }
    }
}

impl Meters {
    /// Create meters with every gauge at 50 and counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a meter value.
    pub fn get(&self, kind: MeterKind) -> i32 {
        self.meters.get(&kind).copied().unwrap_or(0)
    }

    /// Cumulative score. Unbounded in both directions.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Available funds. Unbounded; may go negative.
    pub fn funds(&self) -> i64 {
        self.funds
    }

    /// Return a copy with the given meter set, clamped to 0-100.
    pub fn with_meter(mut self, kind: MeterKind, value: i32) -> Self {
        self.meters.insert(kind, value.clamp(METER_MIN, METER_MAX));
        self
    }

    /// Return a copy with a signed delta folded into the given meter,
    /// clamped to 0-100.
    pub fn with_meter_delta(self, kind: MeterKind, delta: i32) -> Self {
        let current = self.get(kind);
        self.with_meter(kind, current.saturating_add(delta))
    }

    /// Return a copy with the score delta applied. Never clamped.
    pub fn with_score_delta(mut self, delta: i64) -> Self {
        self.score += delta;
        self
    }

    /// Return a copy with the funds delta applied. Never clamped.
    pub fn with_funds_delta(mut self, delta: i64) -> Self {
        self.funds += delta;
        self
    }
}
