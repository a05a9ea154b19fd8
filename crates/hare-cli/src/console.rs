//! Console transport
//!
//! Stands in for a chat platform: interactive messages, edits and private
//! messages are written as text lines. Users can be marked as having blocked
//! the bot or as never having opened a private chat with it, to try the
//! failure paths of a round.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hare_core::{
    ChatId, Clock, DeliveryFailure, HareError, HareResult, MessageId, MessageRef, Participant,
    ParticipantId, Recipient, RenderedState, Transport,
};
use tracing::debug;

/// Where console output goes
enum Sink {
    Stdout,
    Buffer(Mutex<Vec<String>>),
}

#[derive(Default)]
struct Registry {
    next_id: i64,
    messages: HashMap<MessageId, MessageRef>,
    latest: HashMap<ChatId, MessageId>,
    inactive: HashSet<MessageId>,
    blocked: HashSet<ParticipantId>,
    strangers: HashSet<ParticipantId>,
}

/// Transport printing every outgoing message
pub struct ConsoleTransport {
    clock: Arc<dyn Clock>,
    sink: Sink,
    show_private: bool,
    registry: Mutex<Registry>,
}

impl ConsoleTransport {
    /// Transport writing to stdout
    pub fn new(clock: Arc<dyn Clock>, show_private: bool) -> Self {
        Self::with_sink(clock, Sink::Stdout, show_private)
    }

    /// Transport collecting its output in memory, see `take_output`
    pub fn buffered(clock: Arc<dyn Clock>) -> Self {
        Self::with_sink(clock, Sink::Buffer(Mutex::new(Vec::new())), true)
    }

    fn with_sink(clock: Arc<dyn Clock>, sink: Sink, show_private: bool) -> Self {
        Self {
            clock,
            sink,
            show_private,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Lines written since the last call; always empty for stdout
    pub fn take_output(&self) -> Vec<String> {
        match &self.sink {
            Sink::Stdout => Vec::new(),
            Sink::Buffer(lines) => std::mem::take(&mut *lines.lock().unwrap_or_else(|e| e.into_inner())),
        }
    }

    /// Message posted as `#id`, if any
    pub fn message(&self, id: MessageId) -> Option<MessageRef> {
        self.registry().messages.get(&id).cloned()
    }

    /// Most recent interactive message posted in `chat`
    pub fn latest(&self, chat: ChatId) -> Option<MessageRef> {
        let registry = self.registry();
        let id = registry.latest.get(&chat)?;
        registry.messages.get(id).cloned()
    }

    pub fn set_blocked(&self, participant: ParticipantId, blocked: bool) {
        let mut registry = self.registry();
        if blocked {
            registry.blocked.insert(participant);
        } else {
            registry.blocked.remove(&participant);
        }
    }

    pub fn set_stranger(&self, participant: ParticipantId, stranger: bool) {
        let mut registry = self.registry();
        if stranger {
            registry.strangers.insert(participant);
        } else {
            registry.strangers.remove(&participant);
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, line: String) {
        match &self.sink {
            Sink::Stdout => println!("{}", line),
            Sink::Buffer(lines) => lines.lock().unwrap_or_else(|e| e.into_inner()).push(line),
        }
    }

    fn emit_state(&self, header: String, state: &RenderedState) {
        self.emit(header);
        for line in state.text.lines() {
            self.emit(format!("  | {}", line));
        }
        let buttons: Vec<String> = state
            .controls
            .iter()
            .map(|control| format!("[{}]", control.label))
            .collect();
        self.emit(format!("  | {}", buttons.join(" ")));
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn post_interactive(&self, chat: ChatId, state: &RenderedState) -> HareResult<MessageRef> {
        let message = {
            let mut registry = self.registry();
            registry.next_id += 1;
            let id = MessageId::new(registry.next_id);
            let message = MessageRef::new(chat, id, self.clock.now());
            registry.messages.insert(id, message.clone());
            registry.latest.insert(chat, id);
            message
        };
        self.emit_state(format!("[chat {}] #{}", chat, message.id), state);
        Ok(message)
    }

    async fn edit_interactive(&self, message: &MessageRef, state: &RenderedState) -> HareResult<()> {
        if self.registry().inactive.contains(&message.id) {
            return Err(HareError::transport(format!(
                "message #{} no longer accepts edits",
                message.id
            )));
        }
        self.emit_state(format!("[chat {}] #{} (edited)", message.chat, message.id), state);
        Ok(())
    }

    async fn deactivate_controls(&self, message: &MessageRef) -> HareResult<()> {
        if self.registry().inactive.insert(message.id) {
            self.emit(format!("[chat {}] #{} buttons removed", message.chat, message.id));
        }
        Ok(())
    }

    async fn send_private(&self, participant: &Participant, payload: &str) -> Result<(), DeliveryFailure> {
        {
            let registry = self.registry();
            if registry.blocked.contains(&participant.id) {
                debug!(participant = %participant.id, "recipient blocked the bot");
                return Err(DeliveryFailure::RecipientBlocked);
            }
            if registry.strangers.contains(&participant.id) {
                debug!(participant = %participant.id, "recipient never started the bot");
                return Err(DeliveryFailure::RecipientNeverInitiated);
            }
        }
        if self.show_private {
            self.emit(format!("[private to {}] {}", participant.name, payload));
        } else {
            self.emit(format!("[private to {}] (hidden)", participant.name));
        }
        Ok(())
    }

    async fn notify(&self, recipient: Recipient, text: &str) -> HareResult<()> {
        match recipient {
            Recipient::Chat(chat) => self.emit(format!("[chat {}] {}", chat, text)),
            Recipient::Participant(id) => self.emit(format!("[private to #{}] {}", id, text)),
        }
        Ok(())
    }
}
