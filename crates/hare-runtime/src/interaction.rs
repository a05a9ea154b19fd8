//! Inbound user actions
//!
//! Every action that can change a round is an `Interaction`. Button presses
//! carry the message they were pressed on; commands carry the chat and the
//! text that followed them.

use hare_core::{decode_topic, ChatId, ControlAction, MessageRef, Participant};

/// A user action addressed to one chat's round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Open a fresh round, choosing the deck from `trigger`
    NewRound {
        chat: ChatId,
        initiator: Participant,
        trigger: String,
    },
    Join {
        source: MessageRef,
        actor: Participant,
    },
    Leave {
        source: MessageRef,
        actor: Participant,
    },
    Begin {
        source: MessageRef,
        actor: Participant,
    },
}

impl Interaction {
    /// Interaction for a button press on `source`
    pub fn from_control(action: ControlAction, source: MessageRef, actor: Participant) -> Self {
        match action {
            ControlAction::Join => Interaction::Join { source, actor },
            ControlAction::Leave => Interaction::Leave { source, actor },
            ControlAction::Begin => Interaction::Begin { source, actor },
        }
    }

    pub fn chat(&self) -> ChatId {
        match self {
            Interaction::NewRound { chat, .. } => *chat,
            Interaction::Join { source, .. }
            | Interaction::Leave { source, .. }
            | Interaction::Begin { source, .. } => source.chat,
        }
    }

    pub fn actor(&self) -> &Participant {
        match self {
            Interaction::NewRound { initiator, .. } => initiator,
            Interaction::Join { actor, .. }
            | Interaction::Leave { actor, .. }
            | Interaction::Begin { actor, .. } => actor,
        }
    }
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// Text commands that open rounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/play <text>`
    Play { text: String },
    /// `/start <payload>`, a deep link carrying an encoded topic
    Start { payload: String },
}

/// Payload sent when the bot is added to a group through a deep link
const START_GROUP_PAYLOAD: &str = "startgroup";

impl Command {
    /// Parse a message text. Commands addressed to another bot
    /// (`/play@otherbot`) are ignored.
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let text = text.trim_start();
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text, ""),
        };
        let name = head.strip_prefix('/')?;
        let name = match name.split_once('@') {
            Some((name, addressee)) if addressee.eq_ignore_ascii_case(bot_username) => name,
            Some(_) => return None,
            None => name,
        };

        match name {
            "play" => Some(Command::Play {
                text: rest.to_string(),
            }),
            "start" => Some(Command::Start {
                payload: rest.to_string(),
            }),
            _ => None,
        }
    }

    /// The round this command opens, if any.
    ///
    /// `/start` opens a round only when its payload decodes to a topic; a
    /// bare `/start` or the group-invite payload is a greeting, not a round.
    pub fn into_interaction(self, chat: ChatId, sender: Participant) -> Option<Interaction> {
        let trigger = match self {
            Command::Play { text } => text,
            Command::Start { payload } => {
                if payload.is_empty() || payload == START_GROUP_PAYLOAD {
                    return None;
                }
                decode_topic(&payload)?
            }
        };
        Some(Interaction::NewRound {
            chat,
            initiator: sender,
            trigger,
        })
    }
}
