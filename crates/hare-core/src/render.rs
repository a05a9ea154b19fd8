//! Human-readable rendering of rounds and outcomes
//!
//! Every text the game emits comes from a `Renderer`, so wording and markup
//! can be swapped per platform without touching the round logic.

use crate::config::GameConfig;
use crate::deck::encode_topic;
use crate::session::Session;
use crate::transport::RenderedState;
use crate::types::Participant;

/// Produces every user-facing text of the game
pub trait Renderer: Send + Sync {
    /// The interactive round message: deck, roster and controls
    fn round(&self, session: &Session, config: &GameConfig) -> RenderedState;

    /// Public outcome when every participant received their private message
    fn dealt(&self, players: &[Participant], config: &GameConfig) -> String;

    /// Public outcome naming the participants who could not be reached
    fn undelivered(&self, failed: &[Participant], config: &GameConfig) -> String;

    /// Private notice for the odd-one-out
    fn odd_one_out(&self) -> String;

    /// Reply to a Begin press on a round nobody joined
    fn no_participants(&self) -> String;

    /// Reply to a press on a message that no longer hosts the current round
    fn round_over(&self) -> String;
}

/// Deep link opening a private chat with the bot, optionally carrying a topic
pub fn start_link(bot_username: &str, topic: Option<&str>) -> String {
    match topic {
        Some(topic) => format!(
            "https://t.me/{}?start={}",
            bot_username,
            encode_topic(topic)
        ),
        None => format!("https://t.me/{}", bot_username),
    }
}

/// Join names as "a", "a and b", "a, b and c"
fn list_players(players: &[Participant]) -> String {
    match players {
        [] => String::new(),
        [only] => only.name.clone(),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(|p| p.name.as_str()).collect();
            format!("{} and {}", head.join(", "), last.name)
        }
    }
}

/// Plain text renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn round(&self, session: &Session, config: &GameConfig) -> RenderedState {
        let deck = session.deck().map(|d| d.name()).unwrap_or("none");
        let roster = session.roster();
        let mut text = format!("Deck: {}\n", deck);
        if roster.is_empty() {
            text.push_str("Players: nobody yet\n");
        } else {
            let names: Vec<&str> = roster.iter().map(|p| p.name.as_str()).collect();
            text.push_str(&format!("Players ({}): {}\n", roster.len(), names.join(", ")));
        }
        text.push_str(&format!(
            "Press \"{}\" to play, then \"{}\" to deal the words.",
            config.buttons.join, config.buttons.begin
        ));
        RenderedState {
            text,
            controls: config.buttons.controls(),
        }
    }

    fn dealt(&self, players: &[Participant], config: &GameConfig) -> String {
        format!(
            "Words are dealt! {}, check your private messages from @{}.",
            list_players(players),
            config.bot_username
        )
    }

    fn undelivered(&self, failed: &[Participant], config: &GameConfig) -> String {
        format!(
            "I could not message {} privately. Open {} and press Start, then press \"{}\" again.",
            list_players(failed),
            start_link(&config.bot_username, None),
            config.buttons.begin
        )
    }

    fn odd_one_out(&self) -> String {
        "You are the hare! You don't know the word. Listen closely and bluff.".to_string()
    }

    fn no_participants(&self) -> String {
        "Nobody has joined this round yet.".to_string()
    }

    fn round_over(&self) -> String {
        "This round is over. Start a new one with /play.".to_string()
    }
}
