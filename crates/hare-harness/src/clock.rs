//! Manually driven clock

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use hare_core::Clock;

/// Clock that returns a fixed instant until advanced
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Clock starting at 2024-01-01T00:00:00Z
    pub fn at_epoch() -> Self {
        Self::new(
            Utc.timestamp_opt(1_704_067_200, 0)
                .single()
                .unwrap_or_default(),
        )
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at_epoch()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
