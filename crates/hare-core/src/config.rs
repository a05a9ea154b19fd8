//! Game configuration
//!
//! `GameConfig` is an immutable value handed to the engine at construction.
//! Nothing in the game reads configuration from global state.

use serde::{Deserialize, Serialize};

use crate::errors::{HareError, HareResult};
use crate::transport::{Control, ControlAction};

// ----------------------------------------------------------------------------
// Button Labels
// ----------------------------------------------------------------------------

/// Labels of the three round controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonLabels {
    pub join: String,
    pub leave: String,
    pub begin: String,
}

impl Default for ButtonLabels {
    fn default() -> Self {
        Self {
            join: "Join".to_string(),
            leave: "Leave".to_string(),
            begin: "Begin".to_string(),
        }
    }
}

impl ButtonLabels {
    /// Controls in display order
    pub fn controls(&self) -> Vec<Control> {
        vec![
            Control {
                action: ControlAction::Join,
                label: self.join.clone(),
            },
            Control {
                action: ControlAction::Leave,
                label: self.leave.clone(),
            },
            Control {
                action: ControlAction::Begin,
                label: self.begin.clone(),
            },
        ]
    }
}

// ----------------------------------------------------------------------------
// Game Configuration
// ----------------------------------------------------------------------------

/// Settings shared by the round lifecycle and the resolution protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Minimum time between two dealt rounds, absorbing duplicate Begin presses
    pub debounce_ms: u64,
    /// Messages older than this can no longer be interacted with
    pub message_lifetime_secs: u64,
    /// Username of the bot, used for deep links and addressed commands
    pub bot_username: String,
    pub buttons: ButtonLabels,
}

/// Longest accepted debounce window, one hour
pub const MAX_DEBOUNCE_MS: u64 = 60 * 60 * 1_000;

/// Longest accepted message lifetime, one year
pub const MAX_MESSAGE_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2_000,
            message_lifetime_secs: 24 * 60 * 60,
            bot_username: "hare_game_bot".to_string(),
            buttons: ButtonLabels::default(),
        }
    }
}

impl GameConfig {
    pub fn debounce(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.debounce_ms).unwrap_or(i64::MAX))
    }

    pub fn message_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(
            i64::try_from(self.message_lifetime_secs).unwrap_or(i64::MAX / 1_000),
        )
    }

    pub fn validate(&self) -> HareResult<()> {
        if self.message_lifetime_secs == 0 {
            return Err(HareError::configuration(
                "message lifetime must be greater than 0",
            ));
        }
        if self.message_lifetime_secs > MAX_MESSAGE_LIFETIME_SECS {
            return Err(HareError::configuration(format!(
                "message lifetime must be at most {} seconds",
                MAX_MESSAGE_LIFETIME_SECS
            )));
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(HareError::configuration(format!(
                "debounce must be at most {} milliseconds",
                MAX_DEBOUNCE_MS
            )));
        }
        if self.bot_username.trim().is_empty() {
            return Err(HareError::configuration("bot username must not be empty"));
        }
        let labels = [&self.buttons.join, &self.buttons.leave, &self.buttons.begin];
        if labels.iter().any(|label| label.trim().is_empty()) {
            return Err(HareError::configuration("button labels must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.debounce(), chrono::Duration::seconds(2));
        assert_eq!(config.message_lifetime(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_validation_errors() {
        let config = GameConfig {
            message_lifetime_secs: 0,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.buttons.begin = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upper_bounds() {
        let config = GameConfig {
            debounce_ms: u64::MAX,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GameConfig {
            debounce_ms: MAX_DEBOUNCE_MS,
            ..GameConfig::default()
        };
        config.validate().unwrap();

        let config = GameConfig {
            message_lifetime_secs: MAX_MESSAGE_LIFETIME_SECS + 1,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"debounce_ms": 0}"#).unwrap();
        assert_eq!(config.debounce_ms, 0);
        assert_eq!(config.buttons, ButtonLabels::default());
    }

    #[test]
    fn test_controls_order() {
        let actions: Vec<ControlAction> = ButtonLabels::default()
            .controls()
            .into_iter()
            .map(|c| c.action)
            .collect();
        assert_eq!(
            actions,
            vec![ControlAction::Join, ControlAction::Leave, ControlAction::Begin]
        );
    }
}
