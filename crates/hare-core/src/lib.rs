//! Hare Core
//!
//! Foundational types for the hare game: a social deduction word game where
//! every player in a chat privately receives the same secret word except one,
//! the hare, who has to bluff.
//!
//! This crate owns the data model and the collaborator seams. The session
//! store, the round lifecycle and the resolution protocol live in
//! `hare-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod deck;
pub mod errors;
pub mod render;
pub mod session;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{ButtonLabels, GameConfig};
pub use deck::{decode_topic, encode_topic, Deck, DeckChoice, DeckSelector, TextDeckSelector};
pub use errors::{DeliveryFailure, HareError, HareResult};
pub use render::{start_link, Renderer, TextRenderer};
pub use session::{RoundState, Session};
pub use transport::{Control, ControlAction, Recipient, RenderedState, Transport};
pub use types::{ChatId, Clock, MessageId, MessageRef, Participant, ParticipantId, SystemClock};
