//! Core state types for Memoranda: the sequenced memo inbox, bureau meters,
//! and the deferred-effect ledger.
//!
//! This crate is pure data: no threads, no I/O, no timers. Outcomes are
//! computed eagerly into [`DeferredEffect`]s, parked in the [`EffectLedger`],
//! and folded into live [`Meters`] only when the narration pipeline commits.
//! Every container here updates copy-on-write, so a [`GameState`] snapshot
//! can be read from anywhere without locks.

pub mod effect;
pub mod error;
pub mod ids;
pub mod inbox;
pub mod ledger;
pub mod meters;
pub mod state;
pub mod thread;

pub use effect::{DeferredEffect, EffectDeltas, OutcomeTier};
pub use error::{CoreError, CoreResult};
pub use ids::{ActionKey, MessageId, ThreadId};
pub use inbox::Inbox;
pub use ledger::EffectLedger;
pub use meters::{METER_MAX, METER_MIN, MeterKind, Meters};
pub use state::{GameState, Phase};
pub use thread::{Message, Role, Thread, ThreadKind};
