//! Templated fallback narration.
//!
//! When generation fails or times out, the memo still arrives, written by
//! these stock templates instead of the narrator. Gameplay is never blocked
//! on narration.

use memo_core::OutcomeTier;

use crate::job::JobKind;

/// Stock memo text for a job that produced no narration.
pub fn fallback_text(kind: JobKind, tier: Option<OutcomeTier>) -> String {
    match kind {
        JobKind::Result => result_fallback(tier).to_string(),
        JobKind::InterruptOpen => {
            "URGENT: A situation has developed that requires your immediate \
             attention. Details to follow; respond at once."
                .to_string()
        }
        JobKind::InterruptResolve => {
            "The situation has been handled. A full account will be filed \
             with the registry in due course."
                .to_string()
        }
        JobKind::FreeformReply => {
            "Noted. The desk will act on your instructions.".to_string()
        }
    }
}

fn result_fallback(tier: Option<OutcomeTier>) -> &'static str {
    match tier {
        Some(OutcomeTier::Triumph) => {
            "Report filed: the operation succeeded beyond expectations. \
             Commendations are being drafted."
        }
        Some(OutcomeTier::Success) => {
            "Report filed: the operation concluded as planned. No further \
             action required."
        }
        Some(OutcomeTier::Setback) => {
            "Report filed: the operation ran into complications. Losses were \
             contained; follow-up recommended."
        }
        Some(OutcomeTier::Disaster) => {
            "Report filed: the operation failed badly. Damage assessment \
             underway; expect questions from oversight."
        }
        None => "Report filed: the operation has concluded. See the ledger for details.",
    }
}
