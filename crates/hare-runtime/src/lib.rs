//! Hare Runtime
//!
//! The engine of the hare game:
//! - `SessionStore`: per-chat exclusive access to session state, in process
//!   (`LocalSessionStore`) or durable (`SqliteSessionStore`)
//! - `GameEngine`: the round lifecycle (new round, join, leave, begin)
//! - `resolution`: dealing a round and fanning private messages out to players
//!
//! Types and collaborator traits come from `hare-core`.

pub mod engine;
pub mod interaction;
pub mod resolution;
pub mod store;

pub use engine::{GameEngine, GameEngineBuilder, Outcome, RoundReport};
pub use interaction::{Command, Interaction};
pub use resolution::{Assignment, DeliveryReport};
pub use store::{
    open_store, LeaseRelease, LocalSessionStore, SessionLease, SessionStore, SqliteSessionStore,
    StoreBackend, StoreConfig,
};

// Re-export core types for convenience
pub use hare_core::{
    ChatId, Clock, Deck, DeckSelector, DeliveryFailure, GameConfig, HareError, HareResult,
    MessageRef, Participant, ParticipantId, Recipient, Renderer, Session, SystemClock,
    TextDeckSelector, TextRenderer, Transport,
};
