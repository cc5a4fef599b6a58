//! The immutable game-state snapshot.
//!
//! The snapshot owns the meters, the deferred-effect ledger, and the inbox.
//! It is replaced wholesale on every mutation: updaters consume `self` and
//! return a new value, so readers holding an old snapshot never observe a
//! torn state.

use serde::{Deserialize, Serialize};

use crate::effect::DeferredEffect;
use crate::error::CoreResult;
use crate::ids::{ActionKey, ThreadId};
use crate::inbox::Inbox;
use crate::ledger::EffectLedger;
use crate::meters::Meters;
use crate::thread::Thread;

/// The phase within a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Choosing what to do this turn.
    #[default]
    Planning,
    /// Actions are in flight.
    Acting,
    /// Reviewing the turn's outcomes.
    Debrief,
}

impl Phase {
    /// The phase that follows this one. Debrief wraps to Planning, which is
    /// when the turn counter advances.
    pub fn next(self) -> Self {
        match self {
            Self::Planning => Self::Acting,
            Self::Acting => Self::Debrief,
            Self::Debrief => Self::Planning,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Acting => write!(f, "acting"),
            Self::Debrief => write!(f, "debrief"),
        }
    }
}

/// One immutable snapshot of everything the simulation owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current turn number, starting at 0.
    pub turn: u32,
    /// Current phase within the turn.
    pub phase: Phase,
    /// Bureau meters and counters.
    pub meters: Meters,
    /// Pending, uncommitted effects.
    pub ledger: EffectLedger,
    /// The memo inbox.
    pub inbox: Inbox,
}

impl GameState {
    /// Create a fresh state at turn 0, planning phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with the inbox replaced.
    pub fn with_inbox(mut self, inbox: Inbox) -> Self {
        self.inbox = inbox;
        self
    }

    /// Return a copy with the meters replaced.
    pub fn with_meters(mut self, meters: Meters) -> Self {
        self.meters = meters;
        self
    }

    /// Return a copy with the effect deferred under `key` (overwriting any
    /// existing entry) and the placeholder thread added hidden.
    pub fn with_deferred(mut self, key: ActionKey, effect: DeferredEffect, thread: Thread) -> Self {
        self.ledger.defer(key, effect);
        self.inbox = self.inbox.add_thread(thread);
        self
    }

    /// Commit the pending effect for `key`: fold its deltas into the meters
    /// and drop the ledger entry. Returns the new state and whether an entry
    /// existed. A missing entry is the benign double-commit case, not an
    /// error.
    pub fn apply_effect(mut self, key: &ActionKey) -> (Self, bool) {
        let meters = std::mem::take(&mut self.meters);
        let (meters, ok) = self.ledger.apply(key, meters);
        self.meters = meters;
        (self, ok)
    }

    /// Return a copy with the thread's placeholder body filled and the
    /// thread revealed as most recent.
    pub fn fill_and_reveal(mut self, id: ThreadId, body: impl Into<String>) -> CoreResult<Self> {
        self.inbox = self.inbox.fill_body(id, body)?.reveal(id)?;
        Ok(self)
    }

    /// Return a copy advanced to the next phase, bumping the turn counter
    /// when wrapping back to planning.
    pub fn advance_phase(mut self) -> Self {
        self.phase = self.phase.next();
        if self.phase == Phase::Planning {
            self.turn += 1;
        }
        self
    }
}
