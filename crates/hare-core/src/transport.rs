//! Transport abstraction for the hare game
//!
//! The game never talks to a messaging platform directly. Everything it
//! posts, edits or sends privately goes through `Transport`, which keeps the
//! round logic independent of any particular chat API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{DeliveryFailure, HareResult};
use crate::types::{ChatId, MessageRef, Participant, ParticipantId};

// ----------------------------------------------------------------------------
// Rendered Messages
// ----------------------------------------------------------------------------

/// The button actions an interactive round message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlAction {
    Join,
    Leave,
    Begin,
}

/// A single button on an interactive message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub action: ControlAction,
    pub label: String,
}

/// Text plus controls, ready to be posted or to replace an existing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedState {
    pub text: String,
    pub controls: Vec<Control>,
}

/// Target of a plain notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    Chat(ChatId),
    Participant(ParticipantId),
}

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Messaging platform operations the game depends on
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post a message with controls and return its reference
    async fn post_interactive(&self, chat: ChatId, state: &RenderedState) -> HareResult<MessageRef>;

    /// Replace the text and controls of a previously posted message
    async fn edit_interactive(&self, message: &MessageRef, state: &RenderedState) -> HareResult<()>;

    /// Strip the controls from a message so it can no longer be pressed
    async fn deactivate_controls(&self, message: &MessageRef) -> HareResult<()>;

    /// Send a private message to one participant
    async fn send_private(&self, participant: &Participant, payload: &str) -> Result<(), DeliveryFailure>;

    /// Post a plain text message to a chat or a participant
    async fn notify(&self, recipient: Recipient, text: &str) -> HareResult<()>;
}
