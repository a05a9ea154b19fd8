//! In-process session store
//!
//! One async mutex per chat, created on first access and kept for the life
//! of the process. The map itself is sharded (`DashMap`) and is only touched
//! long enough to clone the chat's mutex, so chats never serialize on each
//! other.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use hare_core::{ChatId, HareResult, Session};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{LeaseRelease, SessionLease, SessionStore};

/// Keyed lock map for single-instance deployments
#[derive(Debug, Default)]
pub struct LocalSessionStore {
    sessions: DashMap<ChatId, Arc<Mutex<Session>>>,
}

impl LocalSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chats seen so far
    pub fn chat_count(&self) -> usize {
        self.sessions.len()
    }

    fn slot(&self, chat: ChatId) -> Arc<Mutex<Session>> {
        // the shard guard is dropped at the end of this statement
        self.sessions.entry(chat).or_default().value().clone()
    }
}

#[async_trait]
impl SessionStore for LocalSessionStore {
    async fn acquire(&self, chat: ChatId) -> HareResult<SessionLease> {
        let guard = self.slot(chat).lock_owned().await;
        debug!(chat = %chat, "local lease acquired");
        let session = guard.clone();
        Ok(SessionLease::new(chat, session, Box::new(LocalRelease { guard })))
    }
}

struct LocalRelease {
    guard: OwnedMutexGuard<Session>,
}

#[async_trait]
impl LeaseRelease for LocalRelease {
    async fn release(self: Box<Self>, session: Session) -> HareResult<()> {
        let LocalRelease { mut guard } = *self;
        *guard = session;
        Ok(())
    }
}
