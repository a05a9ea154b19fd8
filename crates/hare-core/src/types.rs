//! Core types for the hare game
//!
//! Chat, participant and message identifiers use newtypes so that a chat id
//! can never be passed where a participant id is expected.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Identifiers
// ----------------------------------------------------------------------------

/// Identifier of a group chat hosting rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(i64);

impl ChatId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(i64);

impl ParticipantId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message within its chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Participant
// ----------------------------------------------------------------------------

/// A player as seen by the game: identity plus a display name for rendering
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ----------------------------------------------------------------------------
// Message Reference
// ----------------------------------------------------------------------------

/// Reference to a posted message, as handed back by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat: ChatId,
    pub id: MessageId,
    /// When the transport reports the message was posted
    pub posted_at: DateTime<Utc>,
}

impl MessageRef {
    pub fn new(chat: ChatId, id: MessageId, posted_at: DateTime<Utc>) -> Self {
        Self { chat, id, posted_at }
    }

    /// Whether both references point at the same message.
    ///
    /// Timestamps are ignored: a reference rebuilt from a button press may
    /// carry a coarser posting time than the one stored in the session.
    pub fn same_message(&self, other: &MessageRef) -> bool {
        self.chat == other.chat && self.id == other.id
    }

    /// Time elapsed between posting and `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.posted_at)
    }
}

// ----------------------------------------------------------------------------
// Time Source
// ----------------------------------------------------------------------------

/// Wall-clock source for message ages and the debounce window.
///
/// Readings are persisted and compared across processes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
