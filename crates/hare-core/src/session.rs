//! Per-chat session record
//!
//! One `Session` exists per chat. It is created empty on first access and is
//! reset in place whenever a new round opens; it is never deleted.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::deck::Deck;
use crate::types::{MessageRef, Participant, ParticipantId};

// ----------------------------------------------------------------------------
// Round State
// ----------------------------------------------------------------------------

/// Lifecycle position of a chat, derived from the session fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// No interactive message has been posted
    Idle,
    /// The current message accepts join and leave
    Open,
    /// The current round has been dealt
    Resolved,
}

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

/// Mutable record of a chat's current round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    deck: Option<Deck>,
    roster: Vec<Participant>,
    last_message: Option<MessageRef>,
    last_round_started_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over for a new round: new deck, empty roster, no current message.
    ///
    /// `last_round_started_at` survives the reset so the debounce window keeps
    /// covering presses on the previous round's message.
    pub fn reset(&mut self, deck: Deck) {
        self.deck = Some(deck);
        self.roster.clear();
        self.last_message = None;
    }

    pub fn deck(&self) -> Option<&Deck> {
        self.deck.as_ref()
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    /// Permute the roster uniformly at random
    pub fn shuffle_roster<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.roster.shuffle(rng);
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.roster.iter().any(|p| p.id == id)
    }

    /// Add a participant; returns false if they were already on the roster
    pub fn add_participant(&mut self, participant: Participant) -> bool {
        if self.contains(participant.id) {
            return false;
        }
        self.roster.push(participant);
        true
    }

    /// Remove a participant; returns false if they were not on the roster
    pub fn remove_participant(&mut self, id: ParticipantId) -> bool {
        let before = self.roster.len();
        self.roster.retain(|p| p.id != id);
        self.roster.len() != before
    }

    /// A round can be dealt only with at least one participant
    pub fn is_resolvable(&self) -> bool {
        !self.roster.is_empty() && self.deck.is_some()
    }

    pub fn last_message(&self) -> Option<&MessageRef> {
        self.last_message.as_ref()
    }

    pub fn set_last_message(&mut self, message: MessageRef) {
        self.last_message = Some(message);
    }

    /// Whether `source` is the chat's current interactive message
    pub fn is_current(&self, source: &MessageRef) -> bool {
        self.last_message
            .as_ref()
            .is_some_and(|current| current.same_message(source))
    }

    pub fn last_round_started_at(&self) -> Option<DateTime<Utc>> {
        self.last_round_started_at
    }

    pub fn mark_round_started(&mut self, at: DateTime<Utc>) {
        self.last_round_started_at = Some(at);
    }

    /// True while `now` is still inside the debounce window of the last round.
    /// A window reaching past the representable range never closes.
    pub fn within_debounce(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.last_round_started_at.is_some_and(|started| {
            started
                .checked_add_signed(window)
                .map_or(true, |closes| closes > now)
        })
    }

    pub fn state(&self) -> RoundState {
        match (&self.last_message, self.last_round_started_at) {
            (None, _) => RoundState::Idle,
            (Some(message), Some(started)) if started >= message.posted_at => {
                RoundState::Resolved
            }
            (Some(_), _) => RoundState::Open,
        }
    }
}
