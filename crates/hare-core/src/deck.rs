//! Word decks and deck selection
//!
//! A deck is a named, non-empty set of candidate secret words. Which deck a
//! round uses is decided from the free text that opened the round.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{HareError, HareResult};

// ----------------------------------------------------------------------------
// Deck
// ----------------------------------------------------------------------------

/// A named set of candidate secret words, never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDeck")]
pub struct Deck {
    name: String,
    words: Vec<String>,
}

#[derive(Deserialize)]
struct RawDeck {
    name: String,
    words: Vec<String>,
}

impl TryFrom<RawDeck> for Deck {
    type Error = HareError;

    fn try_from(raw: RawDeck) -> HareResult<Self> {
        Deck::new(raw.name, raw.words)
    }
}

impl Deck {
    /// Build a deck, trimming words and dropping blanks and duplicates
    pub fn new<I, S>(name: impl Into<String>, words: I) -> HareResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for word in words {
            let word = word.as_ref().trim();
            if !word.is_empty() && !unique.iter().any(|w| w == word) {
                unique.push(word.to_string());
            }
        }
        if unique.is_empty() {
            return Err(HareError::invalid_deck("a deck needs at least one word"));
        }
        Ok(Self {
            name: name.into(),
            words: unique,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Pick one word uniformly at random
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // words is non-empty by construction, so the fallback is unreachable
        self.words
            .choose(rng)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// Deck Selection
// ----------------------------------------------------------------------------

/// Result of interpreting the text that opened a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckChoice {
    Deck(Deck),
    /// Nothing in the text picked a deck
    Default,
}

/// Chooses the deck for a round from free-form trigger text
pub trait DeckSelector: Send + Sync {
    fn select(&self, trigger: &str) -> DeckChoice;

    fn default_deck(&self) -> Deck;

    /// Resolve the trigger text to a concrete deck
    fn resolve(&self, trigger: &str) -> Deck {
        match self.select(trigger) {
            DeckChoice::Deck(deck) => deck,
            DeckChoice::Default => self.default_deck(),
        }
    }
}

/// Selector over a catalog of named decks.
///
/// Trigger text naming a catalog deck selects it. A comma or newline
/// separated list of at least two distinct words becomes a custom deck.
/// Anything else falls back to the default deck.
#[derive(Debug, Clone)]
pub struct TextDeckSelector {
    default: Deck,
    catalog: Vec<Deck>,
}

impl TextDeckSelector {
    pub const CUSTOM_DECK_NAME: &'static str = "custom";

    pub fn new(default: Deck, catalog: Vec<Deck>) -> Self {
        Self { default, catalog }
    }

    /// Selector with the built-in decks, `places` being the default
    pub fn builtin() -> Self {
        let decks: Vec<Deck> = BUILTIN_DECKS
            .iter()
            .filter_map(|(name, words)| Deck::new(*name, words.iter()).ok())
            .collect();
        let default = decks
            .first()
            .cloned()
            .unwrap_or_else(|| Deck {
                name: "places".to_string(),
                words: vec!["beach".to_string()],
            });
        Self::new(default, decks)
    }

    pub fn catalog(&self) -> &[Deck] {
        &self.catalog
    }

    fn find(&self, name: &str) -> Option<&Deck> {
        self.catalog
            .iter()
            .find(|deck| deck.name().eq_ignore_ascii_case(name))
    }
}

impl Default for TextDeckSelector {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DeckSelector for TextDeckSelector {
    fn select(&self, trigger: &str) -> DeckChoice {
        let trigger = trigger.trim();
        if trigger.is_empty() {
            return DeckChoice::Default;
        }
        if let Some(deck) = self.find(trigger) {
            return DeckChoice::Deck(deck.clone());
        }

        let entries: Vec<&str> = trigger
            .split([',', '\n'])
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();
        if entries.len() < 2 {
            return DeckChoice::Default;
        }
        match Deck::new(Self::CUSTOM_DECK_NAME, entries) {
            Ok(deck) if deck.len() >= 2 => DeckChoice::Deck(deck),
            _ => DeckChoice::Default,
        }
    }

    fn default_deck(&self) -> Deck {
        self.default.clone()
    }
}

const BUILTIN_DECKS: &[(&str, &[&str])] = &[
    (
        "places",
        &[
            "airport", "bakery", "beach", "cathedral", "circus", "embassy", "hospital",
            "library", "submarine", "theatre", "train station", "zoo",
        ],
    ),
    (
        "food",
        &[
            "borscht", "croissant", "dumplings", "lasagne", "omelette", "pancakes", "pizza",
            "ramen", "sushi", "tacos",
        ],
    ),
    (
        "animals",
        &[
            "camel", "dolphin", "eagle", "giraffe", "hedgehog", "kangaroo", "octopus",
            "owl", "penguin", "tiger",
        ],
    ),
    (
        "professions",
        &[
            "astronaut", "baker", "detective", "firefighter", "judge", "librarian",
            "pilot", "plumber", "surgeon", "teacher",
        ],
    ),
];

// ----------------------------------------------------------------------------
// Deep-link Topic Encoding
// ----------------------------------------------------------------------------

/// Encode a topic into a deep-link payload (URL-safe base64, no padding)
pub fn encode_topic(topic: &str) -> String {
    URL_SAFE_NO_PAD.encode(topic.as_bytes())
}

/// Decode a deep-link payload back into a topic.
///
/// Returns `None` for payloads that are not valid encodings or decode to
/// blank text.
pub fn decode_topic(payload: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim()).ok()?;
    let topic = String::from_utf8(bytes).ok()?;
    if topic.trim().is_empty() {
        None
    } else {
        Some(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_deck_rejects_empty() {
        assert!(Deck::new("empty", Vec::<String>::new()).is_err());
        assert!(Deck::new("blank", ["  ", ""]).is_err());
    }

    #[test]
    fn test_deck_trims_and_dedupes() {
        let deck = Deck::new("fruit", [" apple", "pear ", "apple", ""]).unwrap();
        assert_eq!(deck.words(), &["apple".to_string(), "pear".to_string()]);
    }

    #[test]
    fn test_deck_pick_is_member() {
        let deck = Deck::new("fruit", ["apple", "pear", "plum"]).unwrap();
        let mut rng = StepRng::new(0, 1);
        for _ in 0..10 {
            let word = deck.pick(&mut rng).to_string();
            assert!(deck.words().contains(&word));
        }
    }

    #[test]
    fn test_deck_deserialize_validates() {
        let bad = r#"{"name":"x","words":[]}"#;
        assert!(serde_json::from_str::<Deck>(bad).is_err());
        let good = r#"{"name":"x","words":["a"]}"#;
        assert_eq!(serde_json::from_str::<Deck>(good).unwrap().len(), 1);
    }

    #[test]
    fn test_selector_named_deck() {
        let selector = TextDeckSelector::builtin();
        match selector.select("  FOOD ") {
            DeckChoice::Deck(deck) => assert_eq!(deck.name(), "food"),
            other => panic!("expected food deck, got {:?}", other),
        }
    }

    #[test]
    fn test_selector_custom_deck() {
        let selector = TextDeckSelector::builtin();
        let deck = selector.resolve("apple, pear\nplum");
        assert_eq!(deck.name(), TextDeckSelector::CUSTOM_DECK_NAME);
        assert_eq!(deck.len(), 3);
    }

    #[test]
    fn test_selector_falls_back_to_default() {
        let selector = TextDeckSelector::builtin();
        assert_eq!(selector.select(""), DeckChoice::Default);
        assert_eq!(selector.select("something unrelated"), DeckChoice::Default);
        // a single distinct word repeated is not a usable custom deck
        assert_eq!(selector.select("apple, apple"), DeckChoice::Default);
        assert_eq!(selector.resolve("nothing").name(), "places");
    }

    #[test]
    fn test_topic_encoding() {
        let payload = encode_topic("food");
        assert!(payload
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(decode_topic(&payload).as_deref(), Some("food"));
        assert_eq!(decode_topic("startgroup!"), None);
        assert_eq!(decode_topic(&encode_topic("   ")), None);
    }
}
