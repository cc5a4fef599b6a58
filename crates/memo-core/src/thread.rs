//! Memo threads and the messages inside them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{ActionKey, MessageId, ThreadId};

/// Who sent or receives a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The player.
    Director,
    /// Front-office staff.
    Clerk,
    /// An agent reporting from the field.
    FieldAgent,
    /// Automated registry notices.
    Registry,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Director => write!(f, "director"),
            Self::Clerk => write!(f, "clerk"),
            Self::FieldAgent => write!(f, "field agent"),
            Self::Registry => write!(f, "registry"),
        }
    }
}

/// What kind of memo thread this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
    /// The narrated outcome of a player action.
    Result,
    /// An out-of-band event demanding attention.
    Interrupt,
    /// An order from above that must be acknowledged.
    Directive,
    /// Informational only.
    Notice,
}

impl ThreadKind {
    /// Whether threads of this kind sort ahead of everything else while
    /// unread.
    pub fn is_high_priority(self) -> bool {
        matches!(self, Self::Interrupt | Self::Directive)
    }
}

impl fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Result => write!(f, "result"),
            Self::Interrupt => write!(f, "interrupt"),
            Self::Directive => write!(f, "directive"),
            Self::Notice => write!(f, "notice"),
        }
    }
}

/// A single memo in a thread.
///
/// The body may be mutated exactly once after creation: the async fill-in
/// step that replaces a placeholder with narrated text. After that it is
/// immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID.
    pub id: MessageId,
    /// The thread this message belongs to.
    pub thread: ThreadId,
    /// Sender role.
    pub sender: Role,
    /// Recipient role.
    pub recipient: Role,
    /// The memo text. Empty until filled if created as a placeholder.
    pub body: String,
    /// The turn number the message was created on.
    pub turn: u32,
    /// Whether the player has read this message.
    pub read: bool,
    /// Wall-clock creation time.
    pub sent_at: DateTime<Utc>,
    filled: bool,
}

impl Message {
    /// Create a message with its body already written.
    pub fn new(
        thread: ThreadId,
        sender: Role,
        recipient: Role,
        body: impl Into<String>,
        turn: u32,
    ) -> Self {
        Self {
            id: MessageId::new(),
            thread,
            sender,
            recipient,
            body: body.into(),
            turn,
            read: false,
            sent_at: Utc::now(),
            filled: true,
        }
    }

    /// Create a placeholder whose body will be filled exactly once later.
    pub fn placeholder(thread: ThreadId, sender: Role, recipient: Role, turn: u32) -> Self {
        Self {
            id: MessageId::new(),
            thread,
            sender,
            recipient,
            body: String::new(),
            turn,
            read: false,
            sent_at: Utc::now(),
            filled: false,
        }
    }

    /// Whether the body is final (written at creation or filled since).
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    fn fill(&mut self, body: String) {
        self.body = body;
        self.filled = true;
    }
}

/// A conversation thread in the inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Unique thread ID.
    pub id: ThreadId,
    /// Subject line.
    pub subject: String,
    /// The action that created this thread, if any.
    pub key: Option<ActionKey>,
    /// The turn the thread was created on.
    pub created_turn: u32,
    /// Messages in arrival order.
    pub messages: Vec<Message>,
    /// Thread kind.
    pub kind: ThreadKind,
    /// Recency-ordering key, assigned by the inbox. Monotonically increasing
    /// across the log; re-stamped only on user-visible mutations.
    pub sequence: u64,
    /// Whether any read-oriented query may surface this thread.
    pub visible: bool,
}

impl Thread {
    /// Create a visible thread with no messages yet. The inbox assigns the
    /// sequence number on insert.
    pub fn new(subject: impl Into<String>, kind: ThreadKind, created_turn: u32) -> Self {
        Self {
            id: ThreadId::new(),
            subject: subject.into(),
            key: None,
            created_turn,
            messages: Vec::new(),
            kind,
            sequence: 0,
            visible: true,
        }
    }

    /// Create a hidden placeholder thread for a pending action: one empty
    /// placeholder message, revealed only when the action commits.
    pub fn placeholder(
        subject: impl Into<String>,
        kind: ThreadKind,
        key: ActionKey,
        sender: Role,
        created_turn: u32,
    ) -> Self {
        let mut thread = Self::new(subject, kind, created_turn);
        thread.visible = false;
        thread.key = Some(key);
        let message = Message::placeholder(thread.id, sender, Role::Director, created_turn);
        thread.messages.push(message);
        thread
    }

    /// Attach a message. Prefer `Inbox::add_follow_up`, which also
    /// re-stamps the sequence number.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Whether any message in the thread is unread.
    pub fn is_unread(&self) -> bool {
        self.messages.iter().any(|m| !m.read)
    }

    /// Mark every message read.
    pub fn mark_read(&mut self) {
        for message in &mut self.messages {
            message.read = true;
        }
    }

    /// Fill the thread's placeholder body with final text. Errors if the
    /// thread has no messages or the body was already filled.
    pub fn fill_body(&mut self, body: impl Into<String>) -> CoreResult<()> {
        let id = self.id;
        let message = self
            .messages
            .first_mut()
            .ok_or(CoreError::EmptyThread(id))?;
        if message.is_filled() {
            return Err(CoreError::BodyAlreadyFilled(id));
        }
        message.fill(body.into());
        Ok(())
    }
}
