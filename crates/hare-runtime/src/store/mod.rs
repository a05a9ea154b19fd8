//! Session stores
//!
//! A store hands out a `SessionLease` per chat: the session plus the
//! exclusive right to change it. Only one lease per chat exists at a time;
//! leases for different chats never wait on each other.
//!
//! Mutations are made on the lease and become visible to the next holder
//! only when the lease is released with `SessionLease::release`. Dropping a
//! lease without releasing it discards its changes.

mod local;
mod sqlite;

pub use local::LocalSessionStore;
pub use sqlite::SqliteSessionStore;

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hare_core::{ChatId, Clock, HareError, HareResult, Session};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Store Contract
// ----------------------------------------------------------------------------

/// Keyed store of chat sessions with per-chat exclusive access
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Wait for exclusive access to the session of `chat`, creating an empty
    /// session if the chat has never been seen
    async fn acquire(&self, chat: ChatId) -> HareResult<SessionLease>;
}

/// Store-specific half of a lease: writes the session back and gives up access
#[async_trait]
pub trait LeaseRelease: Send + Sync {
    async fn release(self: Box<Self>, session: Session) -> HareResult<()>;
}

/// Exclusive access to one chat's session
pub struct SessionLease {
    chat: ChatId,
    session: Session,
    releaser: Box<dyn LeaseRelease>,
}

impl SessionLease {
    pub fn new(chat: ChatId, session: Session, releaser: Box<dyn LeaseRelease>) -> Self {
        Self {
            chat,
            session,
            releaser,
        }
    }

    pub fn chat(&self) -> ChatId {
        self.chat
    }

    /// Persist the session and give up exclusive access
    pub async fn release(self) -> HareResult<()> {
        self.releaser.release(self.session).await
    }
}

impl Deref for SessionLease {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for SessionLease {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl core::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionLease")
            .field("chat", &self.chat)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Store Configuration
// ----------------------------------------------------------------------------

/// Which store implementation backs the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process lock map; state is lost on restart
    Local,
    /// SQLite file shared by every instance
    Sqlite,
}

/// Configuration of the session store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file for the sqlite backend
    pub path: Option<PathBuf>,
    /// How long an unreleased sqlite lease blocks other instances
    pub lease_ttl_secs: u64,
    /// Delay between attempts to take a busy sqlite lease
    pub poll_interval_ms: u64,
    /// Give up waiting for a sqlite lease after this long
    pub acquire_timeout_secs: u64,
}

/// Longest accepted sqlite lease ttl, one day
pub const MAX_LEASE_TTL_SECS: u64 = 24 * 60 * 60;

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Local,
            path: None,
            lease_ttl_secs: 30,
            poll_interval_ms: 25,
            acquire_timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    pub fn lease_ttl(&self) -> chrono::Duration {
        let secs = self.lease_ttl_secs.min(MAX_LEASE_TTL_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1_000))
    }

    /// How often a held sqlite lease is pushed forward, a third of the ttl
    pub fn renew_interval(&self) -> Duration {
        Duration::from_millis(self.lease_ttl_secs.min(MAX_LEASE_TTL_SECS) * 1_000 / 3)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn validate(&self) -> HareResult<()> {
        if self.backend == StoreBackend::Sqlite && self.path.is_none() {
            return Err(HareError::configuration(
                "the sqlite store needs a database path",
            ));
        }
        if self.lease_ttl_secs == 0 || self.lease_ttl_secs > MAX_LEASE_TTL_SECS {
            return Err(HareError::configuration(format!(
                "lease ttl must be between 1 and {} seconds",
                MAX_LEASE_TTL_SECS
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(HareError::configuration(
                "poll interval must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Open the store described by `config`
pub async fn open_store(
    config: &StoreConfig,
    clock: Arc<dyn Clock>,
) -> HareResult<Arc<dyn SessionStore>> {
    config.validate()?;
    match config.backend {
        StoreBackend::Local => Ok(Arc::new(LocalSessionStore::new())),
        StoreBackend::Sqlite => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| HareError::configuration("the sqlite store needs a database path"))?;
            let store = SqliteSessionStore::open(path, config, clock).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_requires_path() {
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lease_ttl_bounds() {
        let config = StoreConfig {
            lease_ttl_secs: (i64::MAX / 1_000) as u64,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            lease_ttl_secs: 0,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            lease_ttl_secs: MAX_LEASE_TTL_SECS,
            ..StoreConfig::default()
        };
        config.validate().unwrap();
        assert_eq!(config.lease_ttl(), chrono::Duration::days(1));
    }

    #[test]
    fn test_renew_interval_is_a_third_of_ttl() {
        let config = StoreConfig {
            lease_ttl_secs: 3,
            ..StoreConfig::default()
        };
        assert_eq!(config.renew_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_backend_serde_names() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"backend":"sqlite","path":"/tmp/hare.db"}"#).unwrap();
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.lease_ttl_secs, 30);
        config.validate().unwrap();
    }
}
