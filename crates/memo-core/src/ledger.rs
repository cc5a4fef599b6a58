//! The deferred-effect ledger.
//!
//! Maps action keys to pending effects. Effects are computed eagerly when
//! the player acts but folded into live meters only on an explicit apply,
//! which is how state stays hidden until narration is ready.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::effect::DeferredEffect;
use crate::ids::ActionKey;
use crate::meters::Meters;

/// Key-to-pending-effect map with at-most-once application semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectLedger {
    entries: BTreeMap<ActionKey, DeferredEffect>,
}

impl EffectLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the pending effect for `key`, overwriting any existing entry.
    /// A key maps to at most one pending effect; overwrite never accumulates.
    pub fn defer(&mut self, key: ActionKey, effect: DeferredEffect) {
        self.entries.insert(key, effect);
    }

    /// Store the pending effect for `key`, explicitly summing its deltas
    /// into any existing entry. The existing entry's tier, subject, and
    /// description are kept.
    pub fn defer_merged(&mut self, key: ActionKey, effect: DeferredEffect) {
        match self.entries.remove(&key) {
            Some(existing) => {
                let deltas = existing.deltas.clone().merge(&effect.deltas);
                self.entries.insert(
                    key,
                    DeferredEffect {
                        deltas,
                        ..existing
                    },
                );
            }
            None => {
                self.entries.insert(key, effect);
            }
        }
    }

    /// Fold the pending effect for `key` into `meters` and remove the entry.
    ///
    /// Meter deltas clamp to 0-100; score and funds are unclamped. If no
    /// entry exists the meters come back unchanged with `false`: a benign
    /// no-op, since concurrent completion callbacks are expected to race on
    /// double commits.
    pub fn apply(&mut self, key: &ActionKey, meters: Meters) -> (Meters, bool) {
        let Some(effect) = self.entries.remove(key) else {
            return (meters, false);
        };
        let mut meters = meters;
        for (&kind, &delta) in effect.deltas.meters() {
            meters = meters.with_meter_delta(kind, delta);
        }
        meters = meters
            .with_score_delta(effect.deltas.score())
            .with_funds_delta(effect.deltas.funds());
        (meters, true)
    }

    /// Look at the pending effect for `key` without consuming it. Used to
    /// build narration context before the job dispatches.
    pub fn peek(&self, key: &ActionKey) -> Option<&DeferredEffect> {
        self.entries.get(key)
    }

    /// Whether a pending effect exists for `key`.
    pub fn contains(&self, key: &ActionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of pending effects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger has no pending effects.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all pending effects.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
