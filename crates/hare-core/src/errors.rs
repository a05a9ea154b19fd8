//! Error types for the hare game
//!
//! `HareError` covers operational failures of the store, the transport and
//! configuration. Private delivery outcomes are modelled separately by
//! `DeliveryFailure`, because most of them are an expected part of a round
//! rather than an error.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Operational errors surfaced by the core and the runtime
#[derive(Debug, Error)]
pub enum HareError {
    #[error("Session store unavailable: {0}")]
    Store(String),

    #[error("Timed out after {waited_ms}ms waiting for the session lease of chat {chat}")]
    LeaseTimeout { chat: String, waited_ms: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid deck: {0}")]
    InvalidDeck(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl HareError {
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store(reason.into())
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    pub fn invalid_deck(reason: impl Into<String>) -> Self {
        Self::InvalidDeck(reason.into())
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}

/// Result type for hare operations
pub type HareResult<T> = core::result::Result<T, HareError>;

// ----------------------------------------------------------------------------
// Private Delivery Failures
// ----------------------------------------------------------------------------

/// Why a private message could not be delivered to a participant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The participant never opened a private conversation with the bot
    #[error("recipient never started a private conversation with the bot")]
    RecipientNeverInitiated,
    /// The participant blocked the bot
    #[error("recipient has blocked the bot")]
    RecipientBlocked,
    #[error("private delivery failed: {0}")]
    Other(String),
}

impl DeliveryFailure {
    /// Benign failures are expected and are fixed by the player, not an operator
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            DeliveryFailure::RecipientNeverInitiated | DeliveryFailure::RecipientBlocked
        )
    }
}
