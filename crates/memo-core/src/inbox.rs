//! The sequenced message log.
//!
//! An append-only store of memo threads ordered by monotonically increasing
//! sequence numbers. Every mutator consumes the inbox and returns a new one,
//! so the surrounding simulation can treat any snapshot as immutable.
//!
//! Visibility is the load-bearing invariant: a thread with `visible ==
//! false` physically exists here but must never be surfaced by any
//! read-oriented query.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::ThreadId;
use crate::thread::{Message, Thread};

/// Threaded, sequence-stamped memo storage with a separate trash collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inbox {
    threads: Vec<Thread>,
    trash: Vec<Thread>,
    next_sequence: u64,
}

impl Inbox {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }

    fn position(&self, id: ThreadId) -> CoreResult<usize> {
        self.threads
            .iter()
            .position(|t| t.id == id)
            .ok_or(CoreError::UnknownThread(id))
    }

    /// Insert a thread, assigning it the next sequence number.
    pub fn add_thread(mut self, mut thread: Thread) -> Self {
        thread.sequence = self.bump_sequence();
        self.threads.push(thread);
        self
    }

    /// Append a message to an existing thread and re-stamp the thread's
    /// sequence number so it reorders to most recent.
    pub fn add_follow_up(mut self, id: ThreadId, message: Message) -> CoreResult<Self> {
        let seq = self.bump_sequence();
        let pos = self.position(id)?;
        let thread = &mut self.threads[pos];
        thread.push_message(message);
        thread.sequence = seq;
        Ok(self)
    }

    /// Substitute a thread's content while preserving its identity and its
    /// original sequence number. Content changes must not make a thread
    /// jump order, which is what the async fill-in step relies on.
    pub fn replace_thread(mut self, id: ThreadId, mut new_thread: Thread) -> CoreResult<Self> {
        let pos = self.position(id)?;
        new_thread.id = id;
        new_thread.sequence = self.threads[pos].sequence;
        self.threads[pos] = new_thread;
        Ok(self)
    }

    /// Fill a thread's placeholder body with final text. One-shot; see
    /// [`Thread::fill_body`]. Preserves the sequence number.
    pub fn fill_body(mut self, id: ThreadId, body: impl Into<String>) -> CoreResult<Self> {
        let pos = self.position(id)?;
        self.threads[pos].fill_body(body)?;
        Ok(self)
    }

    /// Make a hidden thread visible and re-stamp its sequence number. The
    /// reveal is a user-visible mutation, so the thread surfaces as most
    /// recent.
    pub fn reveal(mut self, id: ThreadId) -> CoreResult<Self> {
        let seq = self.bump_sequence();
        let pos = self.position(id)?;
        let thread = &mut self.threads[pos];
        thread.visible = true;
        thread.sequence = seq;
        Ok(self)
    }

    /// Mark every message in a thread read. No-op if the thread is missing.
    pub fn mark_read(mut self, id: ThreadId) -> Self {
        if let Ok(pos) = self.position(id) {
            self.threads[pos].mark_read();
        }
        self
    }

    /// Move a thread to the trash. Trashed threads are excluded from all
    /// visible queries. No-op if the thread is missing.
    pub fn trash(mut self, id: ThreadId) -> Self {
        if let Ok(pos) = self.position(id) {
            let thread = self.threads.remove(pos);
            self.trash.push(thread);
        }
        self
    }

    /// Move a thread back out of the trash. No-op if not trashed.
    pub fn restore(mut self, id: ThreadId) -> Self {
        if let Some(pos) = self.trash.iter().position(|t| t.id == id) {
            let thread = self.trash.remove(pos);
            self.threads.push(thread);
        }
        self
    }

    /// Permanently delete everything in the trash.
    pub fn empty_trash(mut self) -> Self {
        self.trash.clear();
        self
    }

    /// Look up a thread by ID, visible or not. Internal plumbing for the
    /// pipeline; not a player-facing query.
    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    /// All visible threads, unordered.
    pub fn visible(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter().filter(|t| t.visible)
    }

    /// Visible threads in display order: high-priority unread first, then
    /// unread, then sequence number descending.
    pub fn ordered(&self) -> Vec<&Thread> {
        let mut threads: Vec<&Thread> = self.visible().collect();
        threads.sort_by(|a, b| {
            let a_hot = a.kind.is_high_priority() && a.is_unread();
            let b_hot = b.kind.is_high_priority() && b.is_unread();
            b_hot
                .cmp(&a_hot)
                .then(b.is_unread().cmp(&a.is_unread()))
                .then(b.sequence.cmp(&a.sequence))
        });
        threads
    }

    /// Number of visible threads with unread messages.
    pub fn unread_count(&self) -> usize {
        self.visible().filter(|t| t.is_unread()).count()
    }

    /// Whether a visible, unread interrupt thread exists.
    pub fn has_unread_interrupt(&self) -> bool {
        self.visible()
            .any(|t| t.kind.is_high_priority() && t.is_unread())
    }

    /// The thread the UI should auto-open: the highest-priority unread
    /// thread, but only when nothing is currently selected. Never steals
    /// focus from an open thread.
    pub fn auto_select(&self, current: Option<ThreadId>) -> Option<ThreadId> {
        if current.is_some() {
            return None;
        }
        self.ordered().iter().find(|t| t.is_unread()).map(|t| t.id)
    }

    /// Number of threads outside the trash, hidden ones included.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Whether there are no threads outside the trash.
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Number of trashed threads.
    pub fn trash_len(&self) -> usize {
        self.trash.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ActionKey;
    use crate::thread::{Role, ThreadKind};

    fn visible_thread(subject: &str, kind: ThreadKind) -> Thread {
        let mut t = Thread::new(subject, kind, 1);
        let m = Message::new(t.id, Role::Clerk, Role::Director, "body", 1);
        t.push_message(m);
        t
    }

    fn hidden_thread(subject: &str) -> Thread {
        Thread::placeholder(
            subject,
            ThreadKind::Result,
            ActionKey::from(subject),
            Role::Clerk,
            1,
        )
    }

    #[test]
    fn add_assigns_increasing_sequence() {
        let inbox = Inbox::new()
            .add_thread(visible_thread("A", ThreadKind::Notice))
            .add_thread(visible_thread("B", ThreadKind::Notice));
        let ordered = inbox.ordered();
        assert_eq!(ordered.len(), 2);
        assert!(ordered[0].sequence > ordered[1].sequence);
        assert_eq!(ordered[0].subject, "B");
    }

    #[test]
    fn hidden_threads_absent_from_queries() {
        let inbox = Inbox::new().add_thread(hidden_thread("pending"));
        assert_eq!(inbox.ordered().len(), 0);
        assert_eq!(inbox.unread_count(), 0);
        assert!(!inbox.has_unread_interrupt());
        assert!(inbox.auto_select(None).is_none());
        // Physically present all the same.
        assert_eq!(inbox.len(), 1);
    }

    #[test]
    fn follow_up_restamps_sequence() {
        let a = visible_thread("A", ThreadKind::Notice);
        let a_id = a.id;
        let inbox = Inbox::new()
            .add_thread(a)
            .add_thread(visible_thread("B", ThreadKind::Notice));

        let m = Message::new(a_id, Role::FieldAgent, Role::Director, "update", 2);
        let inbox = inbox.add_follow_up(a_id, m).unwrap();

        let ordered = inbox.ordered();
        assert_eq!(ordered[0].subject, "A");
        assert_eq!(ordered[0].messages.len(), 2);
    }

    #[test]
    fn replace_preserves_sequence() {
        let a = visible_thread("A", ThreadKind::Notice);
        let a_id = a.id;
        let inbox = Inbox::new()
            .add_thread(a)
            .add_thread(visible_thread("B", ThreadKind::Notice));

        let before = inbox.get(a_id).unwrap().sequence;
        let replacement = visible_thread("A rewritten", ThreadKind::Notice);
        let inbox = inbox.replace_thread(a_id, replacement).unwrap();

        let after = inbox.get(a_id).unwrap();
        assert_eq!(after.sequence, before);
        assert_eq!(after.subject, "A rewritten");
        // Still behind B in recency.
        assert_eq!(inbox.ordered()[0].subject, "B");
    }

    #[test]
    fn reveal_bumps_sequence_and_surfaces() {
        let pending = hidden_thread("card1");
        let id = pending.id;
        let inbox = Inbox::new()
            .add_thread(pending)
            .add_thread(visible_thread("B", ThreadKind::Notice));

        let inbox = inbox.fill_body(id, "Narrated outcome.").unwrap();
        // Fill alone changes nothing user-visible.
        assert_eq!(inbox.ordered().len(), 1);

        let inbox = inbox.reveal(id).unwrap();
        let ordered = inbox.ordered();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].id, id);
        assert_eq!(ordered[0].messages[0].body, "Narrated outcome.");
    }

    #[test]
    fn fill_body_is_one_shot() {
        let pending = hidden_thread("card1");
        let id = pending.id;
        let inbox = Inbox::new().add_thread(pending);
        let inbox = inbox.fill_body(id, "first").unwrap();
        assert!(matches!(
            inbox.fill_body(id, "second"),
            Err(CoreError::BodyAlreadyFilled(_))
        ));
    }

    #[test]
    fn unknown_thread_errors() {
        let inbox = Inbox::new();
        let ghost = ThreadId::new();
        assert!(matches!(
            inbox.clone().reveal(ghost),
            Err(CoreError::UnknownThread(_))
        ));
        assert!(matches!(
            inbox.fill_body(ghost, "x"),
            Err(CoreError::UnknownThread(_))
        ));
    }

    #[test]
    fn ordering_priorities() {
        let notice = visible_thread("notice", ThreadKind::Notice);
        let interrupt = visible_thread("interrupt", ThreadKind::Interrupt);
        let mut read_result = visible_thread("read result", ThreadKind::Result);
        read_result.mark_read();

        // Insert so that the read thread is most recent by sequence.
        let inbox = Inbox::new()
            .add_thread(interrupt)
            .add_thread(notice)
            .add_thread(read_result);

        let ordered = inbox.ordered();
        assert_eq!(ordered[0].subject, "interrupt"); // high priority + unread
        assert_eq!(ordered[1].subject, "notice"); // unread
        assert_eq!(ordered[2].subject, "read result"); // read, despite recency
    }

    #[test]
    fn read_interrupt_loses_priority() {
        let mut interrupt = visible_thread("interrupt", ThreadKind::Interrupt);
        interrupt.mark_read();
        let inbox = Inbox::new()
            .add_thread(interrupt)
            .add_thread(visible_thread("notice", ThreadKind::Notice));
        assert_eq!(inbox.ordered()[0].subject, "notice");
        assert!(!inbox.has_unread_interrupt());
    }

    #[test]
    fn auto_select_only_when_nothing_open() {
        let interrupt = visible_thread("interrupt", ThreadKind::Interrupt);
        let other = visible_thread("notice", ThreadKind::Notice);
        let other_id = other.id;
        let interrupt_id = interrupt.id;
        let inbox = Inbox::new().add_thread(other).add_thread(interrupt);

        assert_eq!(inbox.auto_select(None), Some(interrupt_id));
        // A thread is open: never steal focus, even for an interrupt.
        assert_eq!(inbox.auto_select(Some(other_id)), None);
    }

    #[test]
    fn trash_and_restore() {
        let a = visible_thread("A", ThreadKind::Notice);
        let a_id = a.id;
        let inbox = Inbox::new().add_thread(a).trash(a_id);
        assert_eq!(inbox.ordered().len(), 0);
        assert_eq!(inbox.unread_count(), 0);
        assert_eq!(inbox.trash_len(), 1);

        let inbox = inbox.restore(a_id);
        assert_eq!(inbox.ordered().len(), 1);
        assert_eq!(inbox.trash_len(), 0);
    }

    #[test]
    fn empty_trash_is_permanent() {
        let a = visible_thread("A", ThreadKind::Notice);
        let a_id = a.id;
        let inbox = Inbox::new().add_thread(a).trash(a_id).empty_trash();
        assert_eq!(inbox.trash_len(), 0);
        let inbox = inbox.restore(a_id);
        assert!(inbox.is_empty());
    }

    #[test]
    fn mark_read_clears_unread_count() {
        let a = visible_thread("A", ThreadKind::Notice);
        let a_id = a.id;
        let inbox = Inbox::new().add_thread(a);
        assert_eq!(inbox.unread_count(), 1);
        let inbox = inbox.mark_read(a_id);
        assert_eq!(inbox.unread_count(), 0);
    }

    #[test]
    fn serde_roundtrip() {
        let inbox = Inbox::new()
            .add_thread(visible_thread("A", ThreadKind::Notice))
            .add_thread(hidden_thread("pending"));
        let json = serde_json::to_string(&inbox).unwrap();
        let inbox2: Inbox = serde_json::from_str(&json).unwrap();
        assert_eq!(inbox, inbox2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hidden_threads_never_surface(hidden in 0usize..8, shown in 0usize..8) {
                let mut inbox = Inbox::new();
                for i in 0..hidden {
                    inbox = inbox.add_thread(hidden_thread(&format!("h{i}")));
                }
                for i in 0..shown {
                    inbox = inbox.add_thread(visible_thread(&format!("v{i}"), ThreadKind::Notice));
                }
                prop_assert_eq!(inbox.ordered().len(), shown);
                prop_assert_eq!(inbox.unread_count(), shown);
                prop_assert_eq!(inbox.len(), hidden + shown);
            }

            #[test]
            fn sequence_numbers_stay_unique(adds in 1usize..12, reveal_at in 0usize..12) {
                let mut inbox = Inbox::new();
                let mut ids = Vec::new();
                for i in 0..adds {
                    let t = hidden_thread(&format!("t{i}"));
                    ids.push(t.id);
                    inbox = inbox.add_thread(t);
                }
                if let Some(&id) = ids.get(reveal_at % adds) {
                    inbox = inbox.reveal(id).unwrap();
                }
                let mut seqs: Vec<u64> = ids
                    .iter()
                    .map(|&id| inbox.get(id).unwrap().sequence)
                    .collect();
                seqs.sort_unstable();
                seqs.dedup();
                prop_assert_eq!(seqs.len(), adds);
            }
        }
    }
}
