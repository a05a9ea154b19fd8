//! Console commands
//!
//! Each input line of `hare play` is one user action in the simulated chat:
//!
//! ```text
//! /play alice food      alice sends "/play food" to the current chat
//! join bob              bob presses Join on the latest round message
//! join carol @3         carol presses Join on message #3
//! leave bob | begin alice
//! block carol | unblock carol | stranger carol
//! chat -2               switch to chat -2
//! help | quit
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use hare_core::{ChatId, ControlAction, MessageId, Participant, ParticipantId};
use hare_runtime::{Command, GameEngine, Interaction, Outcome};
use tracing::debug;

use crate::console::ConsoleTransport;
use crate::error::{CliError, Result};

pub const HELP: &str = "\
commands:
  /play <user> [deck or words]   open a round as <user>
  /start <user> <payload>        open a round from a deep link payload
  join|leave|begin <user> [@id]  press a button on the latest (or #id) round message
  block|unblock <user>           <user> blocks or unblocks the bot
  stranger <user>                <user> never opened a private chat with the bot
  chat <id>                      switch to another chat
  help                           show this help
  quit                           leave";

// ----------------------------------------------------------------------------
// Parsing
// ----------------------------------------------------------------------------

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// A user sends a command message to the chat
    Say { user: String, text: String },
    /// A user presses a button
    Press {
        action: ControlAction,
        user: String,
        message: Option<MessageId>,
    },
    Block { user: String, blocked: bool },
    Stranger { user: String },
    SwitchChat(ChatId),
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse a line; `Ok(None)` for blank lines
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };

        if head.starts_with('/') {
            let user = words
                .next()
                .ok_or_else(|| CliError::command(format!("{} needs a user name", head)))?;
            let rest: Vec<&str> = words.collect();
            let text = if rest.is_empty() {
                head.to_string()
            } else {
                format!("{} {}", head, rest.join(" "))
            };
            return Ok(Some(ConsoleCommand::Say {
                user: user.to_string(),
                text,
            }));
        }

        let command = match head {
            "join" | "leave" | "begin" => {
                let action = match head {
                    "join" => ControlAction::Join,
                    "leave" => ControlAction::Leave,
                    _ => ControlAction::Begin,
                };
                let user = required_user(head, words.next())?;
                let message = match words.next() {
                    Some(target) => Some(parse_message_id(target)?),
                    None => None,
                };
                ConsoleCommand::Press {
                    action,
                    user,
                    message,
                }
            }
            "block" | "unblock" => ConsoleCommand::Block {
                user: required_user(head, words.next())?,
                blocked: head == "block",
            },
            "stranger" => ConsoleCommand::Stranger {
                user: required_user(head, words.next())?,
            },
            "chat" => {
                let id = words
                    .next()
                    .and_then(|id| id.parse::<i64>().ok())
                    .ok_or_else(|| CliError::command("chat needs a numeric id"))?;
                ConsoleCommand::SwitchChat(ChatId::new(id))
            }
            "help" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(CliError::command(format!("unknown command '{}'", other))),
        };
        Ok(Some(command))
    }
}

fn required_user(command: &str, user: Option<&str>) -> Result<String> {
    user.map(str::to_string)
        .ok_or_else(|| CliError::command(format!("{} needs a user name", command)))
}

fn parse_message_id(target: &str) -> Result<MessageId> {
    target
        .strip_prefix('@')
        .and_then(|id| id.parse::<i64>().ok())
        .map(MessageId::new)
        .ok_or_else(|| CliError::command(format!("expected @<message id>, got '{}'", target)))
}

// ----------------------------------------------------------------------------
// Console Session
// ----------------------------------------------------------------------------

/// What the caller should do after a line was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Simulated chat driving the engine
pub struct Console {
    engine: GameEngine,
    transport: Arc<ConsoleTransport>,
    chat: ChatId,
    users: HashMap<String, Participant>,
}

impl Console {
    pub fn new(engine: GameEngine, transport: Arc<ConsoleTransport>, chat: ChatId) -> Self {
        Self {
            engine,
            transport,
            chat,
            users: HashMap::new(),
        }
    }

    pub fn chat(&self) -> ChatId {
        self.chat
    }

    /// The participant behind a console user name; ids are handed out in
    /// order of first appearance
    fn user(&mut self, name: &str) -> Participant {
        let next_id = i64::try_from(self.users.len()).unwrap_or(i64::MAX - 1) + 1;
        self.users
            .entry(name.to_string())
            .or_insert_with(|| Participant::new(ParticipantId::new(next_id), name))
            .clone()
    }

    /// Handle one input line, returning a short status for the user
    pub async fn handle_line(&mut self, line: &str) -> Result<(Flow, Option<String>)> {
        let Some(command) = ConsoleCommand::parse(line)? else {
            return Ok((Flow::Continue, None));
        };
        debug!(?command, chat = %self.chat, "console command");

        let status = match command {
            ConsoleCommand::Say { user, text } => {
                let sender = self.user(&user);
                let bot = self.engine.config().bot_username.clone();
                match Command::parse(&text, &bot).and_then(|c| c.into_interaction(self.chat, sender)) {
                    Some(interaction) => Some(self.dispatch(interaction).await?),
                    None => Some(format!("(the bot ignores '{}')", text)),
                }
            }
            ConsoleCommand::Press {
                action,
                user,
                message,
            } => {
                let actor = self.user(&user);
                let source = match message {
                    Some(id) => self
                        .transport
                        .message(id)
                        .ok_or_else(|| CliError::command(format!("no message #{}", id)))?,
                    None => self.transport.latest(self.chat).ok_or_else(|| {
                        CliError::command(format!("no round message in chat {} yet", self.chat))
                    })?,
                };
                let interaction = Interaction::from_control(action, source, actor);
                Some(self.dispatch(interaction).await?)
            }
            ConsoleCommand::Block { user, blocked } => {
                let participant = self.user(&user);
                self.transport.set_blocked(participant.id, blocked);
                None
            }
            ConsoleCommand::Stranger { user } => {
                let participant = self.user(&user);
                self.transport.set_stranger(participant.id, true);
                None
            }
            ConsoleCommand::SwitchChat(chat) => {
                self.chat = chat;
                Some(format!("now in chat {}", chat))
            }
            ConsoleCommand::Help => Some(HELP.to_string()),
            ConsoleCommand::Quit => return Ok((Flow::Quit, None)),
        };
        Ok((Flow::Continue, status))
    }

    async fn dispatch(&self, interaction: Interaction) -> Result<String> {
        let outcome = self.engine.dispatch(interaction).await?;
        Ok(describe(&outcome))
    }
}

/// One-line summary of an outcome
pub fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::RoundOpened { message: Some(m) } => format!("(round opened as #{})", m.id),
        Outcome::RoundOpened { message: None } => "(round opened, message not posted)".to_string(),
        Outcome::RosterChanged => "(roster updated)".to_string(),
        Outcome::Unchanged => "(nothing changed)".to_string(),
        Outcome::Stale => "(stale message)".to_string(),
        Outcome::Debounced => "(ignored: round just dealt)".to_string(),
        Outcome::NoParticipants => "(nobody to deal to)".to_string(),
        Outcome::Resolved(report) => format!(
            "(dealt to {} of {} players)",
            report.delivered.len(),
            report.delivered.len() + report.failed.len()
        ),
    }
}
