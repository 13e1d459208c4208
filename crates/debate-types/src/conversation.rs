//! Conversation, message, and summary types.
//!
//! A `Conversation` is the unit every storage backend persists. It owns a
//! bounded, insertion-ordered message log: appends past [`MAX_MESSAGES`]
//! discard the oldest entries first. Fields are private so the identity,
//! topic, and stance stay fixed after construction and the message log can
//! only grow through [`Conversation::append`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Maximum number of messages retained per conversation.
pub const MAX_MESSAGES: usize = 200;

/// Author of a message within a debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Bot => write!(f, "bot"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "bot" => Ok(MessageRole::Bot),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// Side of the debate the bot argues.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (bot_stance IN ('PRO', 'CON'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stance {
    Pro,
    Con,
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stance::Pro => write!(f, "PRO"),
            Stance::Con => write!(f, "CON"),
        }
    }
}

impl FromStr for Stance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PRO" => Ok(Stance::Pro),
            "CON" => Ok(Stance::Con),
            other => Err(format!("invalid stance: '{other}'")),
        }
    }
}

/// A single turn in a conversation.
///
/// Serialized as `{role, message, ts}`; `ts` is milliseconds since the Unix
/// epoch, assigned by the conversation at append time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(rename = "message")]
    pub text: String,
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

/// A debate conversation with a bounded message log.
///
/// Serialized as `{id, topic, stance, messages}`. Deserialization goes
/// through [`ConversationRecord`] so oversized payloads are truncated to the
/// most recent [`MAX_MESSAGES`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConversationRecord")]
pub struct Conversation {
    id: String,
    topic: String,
    stance: Stance,
    messages: Vec<Message>,
}

/// Wire shape of a persisted conversation, before invariants are applied.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub topic: String,
    pub stance: Stance,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Conversation::restore(record.id, record.topic, record.stance, record.messages)
    }
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new(id: impl Into<String>, topic: impl Into<String>, stance: Stance) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            stance,
            messages: Vec::with_capacity(16),
        }
    }

    /// Rebuild a conversation from persisted parts.
    ///
    /// Message timestamps are kept as stored. If more than [`MAX_MESSAGES`]
    /// are supplied only the most recent ones are retained.
    pub fn restore(
        id: impl Into<String>,
        topic: impl Into<String>,
        stance: Stance,
        mut messages: Vec<Message>,
    ) -> Self {
        truncate_oldest(&mut messages);
        Self {
            id: id.into(),
            topic: topic.into(),
            stance,
            messages,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn stance(&self) -> Stance {
        self.stance
    }

    /// Read-only view of the full message log, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Append a message stamped with the current time.
    ///
    /// Timestamps are strictly increasing within a conversation: if the clock
    /// has not advanced past the previous message, the new one is stamped one
    /// millisecond later, saturating at `i64::MAX`. The log is then trimmed
    /// to [`MAX_MESSAGES`].
    pub fn append(&mut self, role: MessageRole, text: impl Into<String>) {
        let now = Utc::now().timestamp_millis();
        let timestamp = match self.messages.last() {
            Some(last) if last.timestamp >= now => last.timestamp.saturating_add(1),
            _ => now,
        };

        self.messages.push(Message {
            role,
            text: text.into(),
            timestamp,
        });
        truncate_oldest(&mut self.messages);
    }

    /// Owned copy of at most `n` most-recent messages, oldest first.
    ///
    /// `n == 0` returns every message.
    pub fn last_n(&self, n: usize) -> Vec<Message> {
        if n == 0 || self.messages.len() <= n {
            return self.messages.clone();
        }
        self.messages[self.messages.len() - n..].to_vec()
    }

    /// Display title derived from topic and stance.
    pub fn title(&self) -> String {
        debate_title(&self.topic, self.stance)
    }

    /// Project this conversation into a summary with the given timestamps.
    pub fn summary(&self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            topic: self.topic.clone(),
            stance: self.stance,
            title: self.title(),
            message_count: self.messages.len() as u32,
            created_at,
            updated_at,
        }
    }
}

fn truncate_oldest(messages: &mut Vec<Message>) {
    if messages.len() > MAX_MESSAGES {
        let excess = messages.len() - MAX_MESSAGES;
        messages.drain(..excess);
    }
}

/// Allocate a new conversation id.
///
/// UUIDv7 strings sort lexicographically in creation order.
pub fn new_conversation_id() -> String {
    Uuid::now_v7().to_string()
}

/// Title shown for a debate: `Debate: {topic} ({STANCE})`.
pub fn debate_title(topic: &str, stance: Stance) -> String {
    format!("Debate: {topic} ({stance})")
}

/// Read-only listing projection of a conversation.
///
/// Only the relational backend records true creation and update instants;
/// the others fill both with the time of the listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(rename = "topic_name")]
    pub topic: String,
    #[serde(rename = "bot_stance")]
    pub stance: Stance,
    pub title: String,
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
