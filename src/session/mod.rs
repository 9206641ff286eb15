//! Session lifecycle state and shared ownership of the live artifact.
//!
//! The artifact has a single-writer discipline: the login flow and the
//! keep-alive refresh observer commit whole artifacts under the write
//! lock; readers take a cheap point-in-time snapshot and never observe a
//! torn write.

pub mod keepalive;

pub use keepalive::{KeepAlive, KeepAliveConfig};

use std::fmt;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::info;

use crate::store::{ArtifactStore, SessionArtifact, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Active,
    Expired,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Active => "active",
            SessionState::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Cheaply cloneable handle to the session's state and current artifact.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<SessionState>>,
    artifact: Arc<RwLock<Option<SessionArtifact>>>,
    store: Arc<ArtifactStore>,
}

impl SessionHandle {
    pub fn new(store: ArtifactStore) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            state: Arc::new(state),
            artifact: Arc::new(RwLock::new(None)),
            store: Arc::new(store),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observe state transitions (keep-alive expiry, logout).
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "session state changed");
        }
    }

    /// Mark the session as rejected by the remote service.
    pub fn invalidate(&self) {
        self.set_state(SessionState::Expired);
    }

    /// Point-in-time copy of the current artifact.
    pub async fn snapshot(&self) -> Option<SessionArtifact> {
        self.artifact.read().await.clone()
    }

    /// Persist and publish a whole artifact. The write lock is held across
    /// the disk write and the in-memory swap, so concurrent committers
    /// serialize and snapshots always see one complete artifact.
    pub(crate) async fn commit(&self, artifact: SessionArtifact) -> Result<(), StoreError> {
        let mut current = self.artifact.write().await;
        self.store.save(&artifact)?;
        *current = Some(artifact);
        Ok(())
    }

    /// Populate the in-memory artifact from the backing store.
    pub(crate) async fn load_persisted(&self) -> Result<bool, StoreError> {
        let loaded = self.store.load()?;
        let restored = loaded.is_some();
        *self.artifact.write().await = loaded;
        Ok(restored)
    }

    /// Drop the artifact from memory and disk.
    pub(crate) async fn clear(&self) -> Result<(), StoreError> {
        let mut current = self.artifact.write().await;
        self.store.clear()?;
        *current = None;
        Ok(())
    }
}
