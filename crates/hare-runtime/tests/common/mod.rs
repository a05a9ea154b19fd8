//! Shared fixtures for the runtime integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use hare_core::{
    ChatId, Deck, GameConfig, MessageRef, Participant, ParticipantId, Session, TextDeckSelector,
};
use hare_harness::{ManualClock, RecordingTransport};
use hare_runtime::{GameEngine, Interaction, LocalSessionStore, Outcome, SessionStore};

pub const CHAT: ChatId = ChatId::new(-100);

pub struct Fixture {
    pub engine: GameEngine,
    pub store: Arc<dyn SessionStore>,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<ManualClock>,
}

pub fn player(id: i64, name: &str) -> Participant {
    Participant::new(ParticipantId::new(id), name)
}

/// Selector that always deals from a one-word "apple" deck
pub fn apple_decks() -> Arc<TextDeckSelector> {
    let apple = Deck::new("fruit", ["apple"]).expect("valid deck");
    Arc::new(TextDeckSelector::new(apple, Vec::new()))
}

pub fn fixture() -> Fixture {
    fixture_with(None, Arc::new(LocalSessionStore::new()))
}

pub fn fixture_with_latency(latency: Duration) -> Fixture {
    fixture_with(Some(latency), Arc::new(LocalSessionStore::new()))
}

pub fn fixture_with(latency: Option<Duration>, store: Arc<dyn SessionStore>) -> Fixture {
    let clock = Arc::new(ManualClock::at_epoch());
    let mut transport = RecordingTransport::new(clock.clone());
    if let Some(latency) = latency {
        transport = transport.with_send_latency(latency);
    }
    let transport = Arc::new(transport);
    let engine = GameEngine::builder(store.clone(), transport.clone())
        .with_config(GameConfig::default())
        .with_decks(apple_decks())
        .with_clock(clock.clone())
        .build()
        .expect("valid engine");
    Fixture {
        engine,
        store,
        transport,
        clock,
    }
}

impl Fixture {
    /// Open a round in `chat` started by `initiator` and return its message
    pub async fn open_round(&self, chat: ChatId, initiator: Participant) -> MessageRef {
        let outcome = self
            .engine
            .dispatch(Interaction::NewRound {
                chat,
                initiator,
                trigger: String::new(),
            })
            .await
            .expect("new round");
        match outcome {
            Outcome::RoundOpened {
                message: Some(message),
            } => message,
            other => panic!("expected an opened round, got {:?}", other),
        }
    }

    pub async fn join(&self, source: &MessageRef, actor: Participant) -> Outcome {
        self.engine
            .dispatch(Interaction::Join {
                source: source.clone(),
                actor,
            })
            .await
            .expect("join")
    }

    pub async fn leave(&self, source: &MessageRef, actor: Participant) -> Outcome {
        self.engine
            .dispatch(Interaction::Leave {
                source: source.clone(),
                actor,
            })
            .await
            .expect("leave")
    }

    pub async fn begin(&self, source: &MessageRef, actor: Participant) -> Outcome {
        self.engine
            .dispatch(Interaction::Begin {
                source: source.clone(),
                actor,
            })
            .await
            .expect("begin")
    }

    /// Snapshot of a chat's session
    pub async fn session(&self, chat: ChatId) -> Session {
        let lease = self.store.acquire(chat).await.expect("lease");
        let snapshot = (*lease).clone();
        lease.release().await.expect("release");
        snapshot
    }
}
