//! Facade wiring the store, validator, login flow, keep-alive, and read
//! client into the session lifecycle:
//!
//! load artifact → validate → login if needed → keep-alive holds `Active`
//! → reads are served for as long as `Active` holds; once the coordinator
//! observes the session lapsed, the next read forces re-authentication.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::client::OperationsClient;
use crate::api::filter::OperationsFilter;
use crate::auth::login;
use crate::auth::validator::{self, Validity};
use crate::browser::BrowserSession;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::OperationsPage;
use crate::output::OperationsView;
use crate::session::{KeepAlive, KeepAliveConfig, SessionHandle, SessionState};
use crate::store::{ArtifactStore, SessionArtifact};

pub struct SessionManager {
    config: Config,
    browser: Arc<dyn BrowserSession>,
    handle: SessionHandle,
    http: reqwest::Client,
    client: OperationsClient,
    keepalive: Mutex<Option<KeepAlive>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Bring up a session: load the persisted artifact, check it against
    /// the remote, run the interactive login if needed, and start the
    /// keep-alive coordinator.
    pub async fn connect(config: Config, browser: Arc<dyn BrowserSession>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::Transport {
                endpoint: config.endpoints.operations_url.clone(),
                primary: format!("http client initialization: {error}"),
                secondary: "not attempted".to_string(),
            })?;

        if let Some(path) = &config.artifact_path {
            if !path.exists() {
                warn!(path = %path.display(), "requested artifact path does not exist; fresh login required");
            }
        }

        let store = ArtifactStore::new(config.resolve_artifact_path());
        let handle = SessionHandle::new(store);

        // a corrupt store forces re-authentication rather than being fatal
        let restored = match handle.load_persisted().await {
            Ok(restored) => restored,
            Err(error) => {
                warn!(error = %error, "artifact store unreadable; treating as absent");
                false
            }
        };

        let client = OperationsClient::new(http.clone(), handle.clone(), browser.clone(), &config);
        let manager = Self {
            config,
            browser,
            handle,
            http,
            client,
            keepalive: Mutex::new(None),
        };

        if restored && manager.stored_artifact_is_valid().await {
            info!("persisted session accepted; no login required");
            manager.handle.set_state(SessionState::Active);
        } else {
            login::run(manager.browser.as_ref(), &manager.handle, &manager.config).await?;
        }

        manager.start_keepalive().await;
        Ok(manager)
    }

    async fn stored_artifact_is_valid(&self) -> bool {
        let Some(artifact) = self.handle.snapshot().await else {
            return false;
        };
        if artifact.is_older_than(self.config.session_lifetime) {
            info!(age = ?artifact.age(), "stored artifact is past the session lifetime; skipping probe");
            return false;
        }
        match validator::probe(
            &self.http,
            &self.config.endpoints,
            &artifact,
            self.config.probe_timeout,
        )
        .await
        {
            Validity::Valid => true,
            Validity::Invalid => {
                info!("stored artifact rejected by the remote");
                false
            }
        }
    }

    async fn start_keepalive(&self) {
        let mut slot = self.keepalive.lock().await;
        if let Some(previous) = slot.take() {
            previous.shutdown().await;
        }
        *slot = Some(KeepAlive::start(
            self.handle.clone(),
            self.browser.clone(),
            KeepAliveConfig::from(&self.config),
        ));
    }

    /// Re-run the interactive login if the session lapsed. Surfaces
    /// `AuthenticationFailed` until a login attempt completes.
    async fn ensure_active(&self) -> Result<()> {
        if self.handle.state() == SessionState::Active {
            return Ok(());
        }
        info!(state = %self.handle.state(), "session not active; re-running login flow");
        {
            let mut slot = self.keepalive.lock().await;
            if let Some(previous) = slot.take() {
                previous.shutdown().await;
            }
        }
        login::run(self.browser.as_ref(), &self.handle, &self.config).await?;
        self.start_keepalive().await;
        Ok(())
    }

    /// Fetch one operations page against the live session.
    pub async fn operations(&self, filter: &OperationsFilter) -> Result<OperationsPage> {
        self.ensure_active().await?;
        self.client.get_operations(filter).await
    }

    /// Fetch one page and convert it to the filter's requested
    /// representation.
    pub async fn operations_view(&self, filter: &OperationsFilter) -> Result<OperationsView> {
        let page = self.operations(filter).await?;
        Ok(page.into_view(filter.output))
    }

    /// Send one explicit warm-up exchange.
    pub async fn warm_up(&self) -> Result<()> {
        self.client.warm_up().await
    }

    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    /// Point-in-time copy of the current credentials.
    pub async fn artifact(&self) -> Option<SessionArtifact> {
        self.handle.snapshot().await
    }

    /// Stop maintenance, keeping the persisted artifact for a later
    /// resume.
    pub async fn shutdown(self) {
        if let Some(keepalive) = self.keepalive.lock().await.take() {
            keepalive.shutdown().await;
        }
        info!("session manager stopped");
    }

    /// Stop maintenance and discard the session artifact.
    pub async fn logout(self) -> Result<()> {
        if let Some(keepalive) = self.keepalive.lock().await.take() {
            keepalive.shutdown().await;
        }
        self.handle.clear().await?;
        self.handle.set_state(SessionState::Unauthenticated);
        info!("logged out; artifact cleared");
        Ok(())
    }
}
