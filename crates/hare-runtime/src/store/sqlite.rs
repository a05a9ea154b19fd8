//! Durable session store backed by SQLite
//!
//! Sessions are stored as JSON next to a lease record. Taking a lease is a
//! conditional update that only succeeds when the row is free or its lease
//! has expired, so any number of processes sharing the database file get the
//! same one-holder-per-chat guarantee as the local store. While a lease is
//! held a background task keeps pushing its expiry forward, so only a holder
//! that stopped running loses it.
//!
//! Schema:
//!
//! ```sql
//! sessions(chat_id INTEGER PRIMARY KEY, state TEXT, lease_token TEXT, lease_expires_at INTEGER)
//! ```
//!
//! Rows are kept indefinitely.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hare_core::{ChatId, Clock, HareError, HareResult, Session};
use rusqlite::{params, Connection, TransactionBehavior};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{LeaseRelease, SessionLease, SessionStore, StoreConfig};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    chat_id INTEGER PRIMARY KEY,
    state TEXT NOT NULL,
    lease_token TEXT,
    lease_expires_at INTEGER
);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn sql(err: rusqlite::Error) -> HareError {
    HareError::store(format!("sqlite: {}", err))
}

fn open_connection(db_path: &Path) -> HareResult<Connection> {
    let connection = Connection::open(db_path).map_err(sql)?;
    connection.busy_timeout(BUSY_TIMEOUT).map_err(sql)?;
    connection
        .query_row("PRAGMA journal_mode=WAL", params![], |_| Ok(()))
        .map_err(sql)?;
    Ok(connection)
}

// ----------------------------------------------------------------------------
// Store
// ----------------------------------------------------------------------------

/// Session store shared between processes through a SQLite file
#[derive(Clone)]
pub struct SqliteSessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    db_path: PathBuf,
    lease_ttl: chrono::Duration,
    renew_interval: Duration,
    poll_interval: Duration,
    acquire_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl SqliteSessionStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open(
        db_path: impl AsRef<Path>,
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> HareResult<Self> {
        config.validate()?;
        let store = Self {
            inner: Arc::new(Inner {
                db_path: db_path.as_ref().to_path_buf(),
                lease_ttl: config.lease_ttl(),
                renew_interval: config.renew_interval(),
                poll_interval: config.poll_interval(),
                acquire_timeout: config.acquire_timeout(),
                clock,
            }),
        };
        store
            .with_connection(|connection| connection.execute_batch(SCHEMA).map_err(sql))
            .await?;
        debug!(path = %store.inner.db_path.display(), "sqlite session store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.inner.db_path
    }

    async fn with_connection<T, F>(&self, func: F) -> HareResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> HareResult<T> + Send + 'static,
    {
        let db_path = self.inner.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = open_connection(&db_path)?;
            func(&mut connection)
        })
        .await
        .map_err(|error| HareError::store(format!("storage task failed: {}", error)))?
    }

    /// One attempt at taking the lease; `None` while someone else holds it
    async fn try_acquire(&self, chat: ChatId, token: String) -> HareResult<Option<Session>> {
        let now = self.inner.clock.now();
        let now_ms = now.timestamp_millis();
        let expires_ms = self.expiry_from(now)?;
        let empty = serde_json::to_string(&Session::new())?;

        self.with_connection(move |connection| {
            let tx = connection
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(sql)?;
            tx.execute(
                "INSERT OR IGNORE INTO sessions (chat_id, state) VALUES (?1, ?2)",
                params![chat.get(), empty],
            )
            .map_err(sql)?;
            let taken = tx
                .execute(
                    "UPDATE sessions SET lease_token = ?2, lease_expires_at = ?3
                     WHERE chat_id = ?1 AND (lease_token IS NULL OR lease_expires_at <= ?4)",
                    params![chat.get(), token, expires_ms, now_ms],
                )
                .map_err(sql)?;
            if taken == 0 {
                tx.commit().map_err(sql)?;
                return Ok(None);
            }
            let state: String = tx
                .query_row(
                    "SELECT state FROM sessions WHERE chat_id = ?1",
                    params![chat.get()],
                    |row| row.get(0),
                )
                .map_err(sql)?;
            // parse before committing so a corrupt row never leaves a dangling lease
            let session: Session = serde_json::from_str(&state)?;
            tx.commit().map_err(sql)?;
            Ok(Some(session))
        })
        .await
    }

    fn expiry_from(&self, now: chrono::DateTime<chrono::Utc>) -> HareResult<i64> {
        now.checked_add_signed(self.inner.lease_ttl)
            .map(|expires| expires.timestamp_millis())
            .ok_or_else(|| HareError::store("lease expiry is out of range"))
    }

    /// Push the expiry of a held lease forward; false once the lease is lost
    async fn extend(&self, chat: ChatId, token: String) -> HareResult<bool> {
        let expires_ms = self.expiry_from(self.inner.clock.now())?;
        let updated = self
            .with_connection(move |connection| {
                connection
                    .execute(
                        "UPDATE sessions SET lease_expires_at = ?3
                         WHERE chat_id = ?1 AND lease_token = ?2",
                        params![chat.get(), token, expires_ms],
                    )
                    .map_err(sql)
            })
            .await?;
        Ok(updated > 0)
    }

    /// Keep a lease alive until the task is aborted or the lease is lost
    fn spawn_renewal(&self, chat: ChatId, token: String) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.inner.renew_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match store.extend(chat, token.clone()).await {
                    Ok(true) => debug!(chat = %chat, "sqlite lease renewed"),
                    Ok(false) => {
                        warn!(chat = %chat, "sqlite lease lost before release");
                        return;
                    }
                    Err(error) => warn!(chat = %chat, %error, "failed to renew sqlite lease"),
                }
            }
        })
    }

    async fn write_back(&self, chat: ChatId, token: String, session: Session) -> HareResult<()> {
        let state = serde_json::to_string(&session)?;
        let updated = self
            .with_connection(move |connection| {
                connection
                    .execute(
                        "UPDATE sessions SET state = ?3, lease_token = NULL, lease_expires_at = NULL
                         WHERE chat_id = ?1 AND lease_token = ?2",
                        params![chat.get(), token, state],
                    )
                    .map_err(sql)
            })
            .await?;
        if updated == 0 {
            return Err(HareError::store(format!(
                "lease on chat {} expired before it was released",
                chat
            )));
        }
        Ok(())
    }

    fn abandon_blocking(&self, chat: ChatId, token: &str) -> HareResult<()> {
        let connection = open_connection(&self.inner.db_path)?;
        connection
            .execute(
                "UPDATE sessions SET lease_token = NULL, lease_expires_at = NULL
                 WHERE chat_id = ?1 AND lease_token = ?2",
                params![chat.get(), token],
            )
            .map_err(sql)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn acquire(&self, chat: ChatId) -> HareResult<SessionLease> {
        let token = Uuid::new_v4().to_string();
        let started = tokio::time::Instant::now();
        loop {
            if let Some(session) = self.try_acquire(chat, token.clone()).await? {
                debug!(chat = %chat, "sqlite lease acquired");
                let renewal = self.spawn_renewal(chat, token.clone());
                let releaser = SqliteRelease {
                    store: self.clone(),
                    chat,
                    token,
                    renewal,
                    released: false,
                };
                return Ok(SessionLease::new(chat, session, Box::new(releaser)));
            }
            let waited = started.elapsed();
            if waited >= self.inner.acquire_timeout {
                return Err(HareError::LeaseTimeout {
                    chat: chat.to_string(),
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(self.inner.poll_interval).await;
        }
    }
}

// ----------------------------------------------------------------------------
// Lease Release
// ----------------------------------------------------------------------------

struct SqliteRelease {
    store: SqliteSessionStore,
    chat: ChatId,
    token: String,
    renewal: JoinHandle<()>,
    released: bool,
}

#[async_trait]
impl LeaseRelease for SqliteRelease {
    async fn release(self: Box<Self>, session: Session) -> HareResult<()> {
        let mut this = self;
        this.released = true;
        this.renewal.abort();
        this.store
            .write_back(this.chat, this.token.clone(), session)
            .await
    }
}

impl Drop for SqliteRelease {
    fn drop(&mut self) {
        self.renewal.abort();
        if self.released {
            return;
        }
        // Unreleased leases are freed in the background when possible and
        // otherwise time out after the lease ttl.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = self.store.clone();
        let chat = self.chat;
        let token = std::mem::take(&mut self.token);
        handle.spawn_blocking(move || {
            if let Err(error) = store.abandon_blocking(chat, &token) {
                warn!(chat = %chat, %error, "failed to free abandoned lease");
            }
        });
    }
}
