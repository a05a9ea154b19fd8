//! Round lifecycle
//!
//! `GameEngine` applies interactions to chat sessions. Every transition runs
//! while holding the chat's lease from the session store, including the whole
//! private delivery fan-out of a Begin, so no join or leave can interleave
//! with a round being dealt.
//!
//! Transport failures inside a transition are logged and never abort it.
//! The only error `dispatch` returns is a failure of the session store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hare_core::{
    ChatId, Clock, DeckSelector, DeliveryFailure, GameConfig, HareResult, MessageRef, Participant,
    ParticipantId, Recipient, Renderer, SystemClock, TextDeckSelector, TextRenderer, Transport,
};
use rand::rngs::OsRng;
use tracing::{debug, error, info};

use crate::interaction::Interaction;
use crate::resolution;
use crate::store::{SessionLease, SessionStore};

// ----------------------------------------------------------------------------
// Outcomes
// ----------------------------------------------------------------------------

/// Summary of a dealt round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// When the Begin press was handled; anchors the debounce window
    pub started_at: DateTime<Utc>,
    pub odd_one_out: ParticipantId,
    pub secret: String,
    pub delivered: Vec<ParticipantId>,
    pub failed: Vec<(ParticipantId, DeliveryFailure)>,
    pub announcement: String,
}

/// What an interaction did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new round was opened; `None` if its message could not be posted
    RoundOpened { message: Option<MessageRef> },
    /// The roster changed and the round message was re-rendered
    RosterChanged,
    /// Valid interaction with nothing to change
    Unchanged,
    /// The interaction targeted an outdated message and was rejected
    Stale,
    /// Begin pressed again within the debounce window
    Debounced,
    /// Begin pressed on a round nobody joined
    NoParticipants,
    Resolved(RoundReport),
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

/// Applies interactions to chat sessions
#[derive(Clone)]
pub struct GameEngine {
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    decks: Arc<dyn DeckSelector>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    config: GameConfig,
}

impl GameEngine {
    pub fn builder(store: Arc<dyn SessionStore>, transport: Arc<dyn Transport>) -> GameEngineBuilder {
        GameEngineBuilder::new(store, transport)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Apply one interaction
    pub async fn dispatch(&self, interaction: Interaction) -> HareResult<Outcome> {
        match interaction {
            Interaction::NewRound {
                chat,
                initiator,
                trigger,
            } => self.new_round(chat, initiator, &trigger).await,
            Interaction::Join { source, actor } => self.join(&source, actor).await,
            Interaction::Leave { source, actor } => self.leave(&source, actor.id).await,
            Interaction::Begin { source, actor } => self.begin(&source, &actor).await,
        }
    }

    async fn new_round(
        &self,
        chat: ChatId,
        initiator: Participant,
        trigger: &str,
    ) -> HareResult<Outcome> {
        let deck = self.decks.resolve(trigger);
        let mut lease = self.store.acquire(chat).await?;

        if let Some(previous) = lease.last_message().cloned() {
            if let Err(error) = self.transport.deactivate_controls(&previous).await {
                error!(chat = %chat, message = %previous.id, %error, "failed to deactivate previous round");
            }
        }

        lease.reset(deck);
        lease.add_participant(initiator);
        let rendered = self.renderer.round(&lease, &self.config);
        let message = match self.transport.post_interactive(chat, &rendered).await {
            Ok(message) => {
                lease.set_last_message(message.clone());
                Some(message)
            }
            Err(error) => {
                error!(chat = %chat, %error, "failed to post round message");
                None
            }
        };
        let deck_name = lease.deck().map(|d| d.name().to_string()).unwrap_or_default();
        lease.release().await?;

        info!(chat = %chat, deck = %deck_name, "round opened");
        Ok(Outcome::RoundOpened { message })
    }

    async fn join(&self, source: &MessageRef, actor: Participant) -> HareResult<Outcome> {
        let now = self.clock.now();
        let Some(mut lease) = self.current_lease(source, now).await? else {
            return Ok(Outcome::Stale);
        };

        let actor_id = actor.id;
        let changed = lease.add_participant(actor);
        if changed {
            self.refresh(&lease).await;
        }
        lease.release().await?;

        debug!(chat = %source.chat, participant = %actor_id, changed, "join");
        Ok(if changed {
            Outcome::RosterChanged
        } else {
            Outcome::Unchanged
        })
    }

    async fn leave(&self, source: &MessageRef, actor: ParticipantId) -> HareResult<Outcome> {
        let now = self.clock.now();
        let Some(mut lease) = self.current_lease(source, now).await? else {
            return Ok(Outcome::Stale);
        };

        let changed = lease.remove_participant(actor);
        if changed {
            self.refresh(&lease).await;
        }
        lease.release().await?;

        debug!(chat = %source.chat, participant = %actor, changed, "leave");
        Ok(if changed {
            Outcome::RosterChanged
        } else {
            Outcome::Unchanged
        })
    }

    async fn begin(&self, source: &MessageRef, actor: &Participant) -> HareResult<Outcome> {
        let started_at = self.clock.now();
        let Some(mut lease) = self.current_lease(source, started_at).await? else {
            return Ok(Outcome::Stale);
        };

        if lease.within_debounce(started_at, self.config.debounce()) {
            lease.release().await?;
            return Ok(Outcome::Debounced);
        }

        let assignment = {
            let mut rng = OsRng;
            resolution::assign(&mut lease, &mut rng)
        };
        let Some(assignment) = assignment else {
            let notice = self.renderer.no_participants();
            if let Err(error) = self
                .transport
                .notify(Recipient::Chat(source.chat), &notice)
                .await
            {
                error!(chat = %source.chat, %error, "failed to send no-participants notice");
            }
            lease.release().await?;
            return Ok(Outcome::NoParticipants);
        };

        info!(
            chat = %source.chat,
            by = %actor.id,
            players = lease.roster().len(),
            "dealing round"
        );
        let notice = self.renderer.odd_one_out();
        let report = resolution::deliver(
            Arc::clone(&self.transport),
            lease.roster(),
            &assignment,
            &notice,
        )
        .await;

        let announcement =
            resolution::announcement(&*self.renderer, &self.config, lease.roster(), &report);
        if let Err(error) = self
            .transport
            .notify(Recipient::Chat(source.chat), &announcement)
            .await
        {
            error!(chat = %source.chat, %error, "failed to post round outcome");
        }

        lease.mark_round_started(started_at);
        lease.release().await?;

        info!(
            chat = %source.chat,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "round dealt"
        );
        Ok(Outcome::Resolved(RoundReport {
            started_at,
            odd_one_out: assignment.odd_one_out.id,
            secret: assignment.secret,
            delivered: report.delivered.iter().map(|p| p.id).collect(),
            failed: report
                .failed
                .into_iter()
                .map(|(p, failure)| (p.id, failure))
                .collect(),
            announcement,
        }))
    }

    /// Lease on the session `source` belongs to, or `None` if `source` is stale.
    ///
    /// The age check needs no lease. The reference check is made under the
    /// lease, since only the holder sees the chat's current message.
    async fn current_lease(
        &self,
        source: &MessageRef,
        now: DateTime<Utc>,
    ) -> HareResult<Option<SessionLease>> {
        if source.age(now) >= self.config.message_lifetime() {
            self.reject_stale(source).await;
            return Ok(None);
        }

        let lease = self.store.acquire(source.chat).await?;
        if !lease.is_current(source) {
            self.reject_stale(source).await;
            lease.release().await?;
            return Ok(None);
        }
        Ok(Some(lease))
    }

    async fn reject_stale(&self, source: &MessageRef) {
        debug!(chat = %source.chat, message = %source.id, "stale interaction");
        let text = self.renderer.round_over();
        if let Err(error) = self.transport.notify(Recipient::Chat(source.chat), &text).await {
            error!(chat = %source.chat, %error, "failed to send round-over notice");
        }
        if let Err(error) = self.transport.deactivate_controls(source).await {
            error!(chat = %source.chat, message = %source.id, %error, "failed to deactivate stale message");
        }
    }

    /// Re-render the current round message after a roster change
    async fn refresh(&self, lease: &SessionLease) {
        let Some(message) = lease.last_message() else {
            return;
        };
        let rendered = self.renderer.round(lease, &self.config);
        if let Err(error) = self.transport.edit_interactive(message, &rendered).await {
            error!(chat = %message.chat, message = %message.id, %error, "failed to update round message");
        }
    }
}

// ----------------------------------------------------------------------------
// Engine Builder
// ----------------------------------------------------------------------------

/// Builder for `GameEngine`; deck selection, rendering and time default to
/// the built-in deck catalog, plain text and the system clock
pub struct GameEngineBuilder {
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    decks: Arc<dyn DeckSelector>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    config: GameConfig,
}

impl GameEngineBuilder {
    pub fn new(store: Arc<dyn SessionStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            decks: Arc::new(TextDeckSelector::builtin()),
            renderer: Arc::new(TextRenderer),
            clock: Arc::new(SystemClock),
            config: GameConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_decks(mut self, decks: Arc<dyn DeckSelector>) -> Self {
        self.decks = decks;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the configuration and build the engine
    pub fn build(self) -> HareResult<GameEngine> {
        self.config.validate()?;
        Ok(GameEngine {
            store: self.store,
            transport: self.transport,
            decks: self.decks,
            renderer: self.renderer,
            clock: self.clock,
            config: self.config,
        })
    }
}
