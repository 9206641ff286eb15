//! Dual-transport client for the operations listing endpoint.
//!
//! Transport-class failures (connectivity, certificates, proxies) are
//! retried with backoff and then fall back to the collaborator relay;
//! application-level rejections are never retried — a known-bad
//! credential cannot succeed, so the session is invalidated immediately.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::filter::OperationsFilter;
use crate::auth::validator::{artifact_headers, sentinel_ok};
use crate::browser::{relay_script, BrowserSession};
use crate::config::{Config, Endpoints};
use crate::error::{Error, Result};
use crate::models::{Operation, OperationsPage};
use crate::session::{SessionHandle, SessionState};
use crate::store::SessionArtifact;

/// Wire shape of the listing response.
#[derive(Debug, Deserialize)]
struct OperationsEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    body: OperationsBody,
}

#[derive(Debug, Default, Deserialize)]
struct OperationsBody {
    #[serde(default)]
    operations: Vec<Operation>,
}

/// What one delivery attempt concluded about the response.
enum Interpreted {
    Page(OperationsPage),
    /// Application-level rejection of the session
    Rejected,
}

pub struct OperationsClient {
    http: reqwest::Client,
    handle: SessionHandle,
    browser: Arc<dyn BrowserSession>,
    endpoints: Endpoints,
    max_retries: u32,
    initial_backoff: Duration,
}

impl OperationsClient {
    pub fn new(
        http: reqwest::Client,
        handle: SessionHandle,
        browser: Arc<dyn BrowserSession>,
        config: &Config,
    ) -> Self {
        Self {
            http,
            handle,
            browser,
            endpoints: config.endpoints.clone(),
            max_retries: config.max_transport_retries,
            initial_backoff: config.initial_backoff,
        }
    }

    /// Endpoints for the nodes this artifact is pinned to.
    fn endpoints_for(&self, artifact: &SessionArtifact) -> Endpoints {
        match &artifact.routing {
            Some(routing) => Endpoints::for_nodes(&routing.web_node, &routing.api_node),
            None => self.endpoints.clone(),
        }
    }

    /// Execute one read query against the live session.
    pub async fn get_operations(&self, filter: &OperationsFilter) -> Result<OperationsPage> {
        filter.validate()?;

        let url = match self.handle.snapshot().await {
            Some(artifact) if self.handle.state() == SessionState::Active => {
                self.endpoints_for(&artifact).operations_url
            }
            _ => {
                return Err(Error::SessionExpired {
                    endpoint: self.endpoints.operations_url.clone(),
                })
            }
        };

        // primary transport, bounded retries on transport-class faults only
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;
        let primary_fault = loop {
            // re-snapshot so retries pick up a concurrent refresh
            let artifact = self.handle.snapshot().await.ok_or_else(|| {
                Error::SessionExpired {
                    endpoint: url.clone(),
                }
            })?;

            let fault = match self.attempt_primary(&url, &artifact, filter).await {
                Ok((status, body)) => match interpret(Some(status), &body, filter) {
                    Ok(Interpreted::Page(page)) => {
                        debug!(count = page.len(), offset = page.offset, "operations page fetched");
                        return Ok(page);
                    }
                    Ok(Interpreted::Rejected) => return Err(self.reject(&url)),
                    Err(fault) => fault,
                },
                Err(fault) => fault,
            };

            attempt += 1;
            if attempt > self.max_retries {
                break fault;
            }
            warn!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %fault,
                "primary transport failed, backing off"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        };

        // secondary transport, exactly once: relay the identical payload
        // through the collaborator's own network stack and live cookies
        warn!(error = %primary_fault, "primary transport exhausted; relaying through collaborator");
        let payload_json =
            serde_json::to_string(&filter.to_payload()).map_err(|error| Error::Transport {
                endpoint: url.clone(),
                primary: primary_fault.clone(),
                secondary: format!("payload serialization: {error}"),
            })?;

        match self.browser.execute(&relay_script(&url, &payload_json)).await {
            Ok(value) => {
                let text = match value.as_str() {
                    Some(text) => text.to_owned(),
                    None => value.to_string(),
                };
                match interpret(None, text.as_bytes(), filter) {
                    Ok(Interpreted::Page(page)) => {
                        debug!(count = page.len(), "operations page fetched via relay");
                        Ok(page)
                    }
                    Ok(Interpreted::Rejected) => Err(self.reject(&url)),
                    Err(secondary) => Err(Error::Transport {
                        endpoint: url,
                        primary: primary_fault,
                        secondary,
                    }),
                }
            }
            Err(error) => Err(Error::Transport {
                endpoint: url,
                primary: primary_fault,
                secondary: error.to_string(),
            }),
        }
    }

    /// One warm-up exchange against the live session.
    pub async fn warm_up(&self) -> Result<()> {
        let artifact = match self.handle.snapshot().await {
            Some(artifact) if self.handle.state() == SessionState::Active => artifact,
            _ => {
                return Err(Error::SessionExpired {
                    endpoint: self.endpoints.warmup_url.clone(),
                })
            }
        };
        let url = self.endpoints_for(&artifact).warmup_url;

        let response = self
            .http
            .post(&url)
            .headers(artifact_headers(&artifact))
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let body = response.bytes().await.unwrap_or_default();
                if sentinel_ok(&body) {
                    debug!("session prolonged");
                    Ok(())
                } else {
                    Err(Error::WarmUpFailed { endpoint: url })
                }
            }
            Ok(_) | Err(_) => Err(Error::WarmUpFailed { endpoint: url }),
        }
    }

    fn reject(&self, url: &str) -> Error {
        warn!(endpoint = %url, "remote rejected the session at the application level");
        self.handle.invalidate();
        Error::SessionExpired {
            endpoint: url.to_string(),
        }
    }

    async fn attempt_primary(
        &self,
        url: &str,
        artifact: &SessionArtifact,
        filter: &OperationsFilter,
    ) -> std::result::Result<(StatusCode, Vec<u8>), String> {
        let response = self
            .http
            .post(url)
            .headers(artifact_headers(artifact))
            .json(&filter.to_payload())
            .send()
            .await
            .map_err(|error| error.to_string())?;

        let status = response.status();
        if status.is_server_error() {
            return Err(format!("server error {status}"));
        }
        let body = response
            .bytes()
            .await
            .map_err(|error| error.to_string())?;
        Ok((status, body.to_vec()))
    }
}

/// Classify a completed exchange. `Err` is a transport-class fault (counts
/// toward retry/fallback); `Rejected` is an application-level rejection.
fn interpret(
    status: Option<StatusCode>,
    body: &[u8],
    filter: &OperationsFilter,
) -> std::result::Result<Interpreted, String> {
    if matches!(
        status,
        Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
    ) {
        return Ok(Interpreted::Rejected);
    }

    let envelope: OperationsEnvelope =
        serde_json::from_slice(body).map_err(|error| format!("unparseable response: {error}"))?;

    if !envelope.success {
        return Ok(Interpreted::Rejected);
    }

    Ok(Interpreted::Page(OperationsPage {
        success: true,
        operations: envelope.body.operations,
        offset: filter.offset,
        size: filter.size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::ScriptedBrowser;
    use crate::store::ArtifactStore;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    /// Connecting to a local closed port fails deterministically at the
    /// transport layer.
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:9/uoh-bh/v1/operations/list";

    fn test_config() -> Config {
        Config {
            max_transport_retries: 1,
            initial_backoff: Duration::from_millis(1),
            endpoints: Endpoints {
                operations_url: DEAD_ENDPOINT.to_string(),
                ..Endpoints::default()
            },
            ..Config::default()
        }
    }

    async fn active_handle(dir: &tempfile::TempDir) -> SessionHandle {
        let handle = SessionHandle::new(ArtifactStore::new(dir.path().join("session.json")));
        // routing deliberately absent so the configured endpoint is used
        let artifact = SessionArtifact::new(
            BTreeMap::from([("JSESSIONID".to_string(), "abc".to_string())]),
            BTreeMap::from([("User-Agent".to_string(), "Mozilla/5.0".to_string())]),
        );
        handle.commit(artifact).await.unwrap();
        handle.set_state(SessionState::Active);
        handle
    }

    fn envelope_with(ids: &[&str]) -> Value {
        json!({
            "success": true,
            "body": {
                "operations": ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>()
            }
        })
    }

    #[tokio::test]
    async fn fallback_is_invoked_exactly_once_and_its_page_returned() {
        let dir = tempfile::tempdir().unwrap();
        let handle = active_handle(&dir).await;
        let browser = Arc::new(ScriptedBrowser::new());
        browser.push_execute_result(Ok(Value::String(
            envelope_with(&["op-1", "op-2"]).to_string(),
        )));

        let client = OperationsClient::new(
            reqwest::Client::new(),
            handle,
            browser.clone(),
            &test_config(),
        );

        let page = client
            .get_operations(&OperationsFilter::default())
            .await
            .unwrap();

        assert!(page.success);
        assert_eq!(page.len(), 2);
        assert_eq!(page.operations[0].id, "op-1");
        // the relay ran exactly once
        assert_eq!(browser.executions().len(), 1);
        let script = &browser.executions()[0];
        assert!(script.contains(DEAD_ENDPOINT));
        assert!(script.contains("paginationOffset"));
    }

    #[tokio::test]
    async fn both_transports_failing_surfaces_a_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let handle = active_handle(&dir).await;
        let browser = Arc::new(ScriptedBrowser::new());
        browser.fail_executes(true);

        let client = OperationsClient::new(
            reqwest::Client::new(),
            handle.clone(),
            browser,
            &test_config(),
        );

        let error = client
            .get_operations(&OperationsFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Transport { .. }));
        // a transport fault is not a session rejection
        assert_eq!(handle.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn application_rejection_expires_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let handle = active_handle(&dir).await;
        let browser = Arc::new(ScriptedBrowser::new());
        browser.push_execute_result(Ok(Value::String(
            json!({"success": false}).to_string(),
        )));

        let client = OperationsClient::new(
            reqwest::Client::new(),
            handle.clone(),
            browser,
            &test_config(),
        );

        let error = client
            .get_operations(&OperationsFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::SessionExpired { .. }));
        assert_eq!(handle.state(), SessionState::Expired);
    }

    #[tokio::test]
    async fn inactive_session_is_rejected_before_any_transport() {
        let dir = tempfile::tempdir().unwrap();
        let handle = SessionHandle::new(ArtifactStore::new(dir.path().join("session.json")));
        let browser = Arc::new(ScriptedBrowser::new());

        let client = OperationsClient::new(
            reqwest::Client::new(),
            handle,
            browser.clone(),
            &test_config(),
        );

        let error = client
            .get_operations(&OperationsFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::SessionExpired { .. }));
        assert!(browser.executions().is_empty());
    }

    #[tokio::test]
    async fn invalid_filters_never_reach_a_transport() {
        let dir = tempfile::tempdir().unwrap();
        let handle = active_handle(&dir).await;
        let browser = Arc::new(ScriptedBrowser::new());

        let client = OperationsClient::new(
            reqwest::Client::new(),
            handle,
            browser.clone(),
            &test_config(),
        );

        let filter = OperationsFilter {
            size: 500,
            ..OperationsFilter::default()
        };
        let error = client.get_operations(&filter).await.unwrap_err();
        assert!(matches!(error, Error::Filter(_)));
        assert!(browser.executions().is_empty());
    }

    #[tokio::test]
    async fn consecutive_pages_do_not_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let handle = active_handle(&dir).await;
        let browser = Arc::new(ScriptedBrowser::new());
        // a stable underlying result set, served page by page
        browser.push_execute_result(Ok(Value::String(
            envelope_with(&["op-1", "op-2", "op-3"]).to_string(),
        )));
        browser.push_execute_result(Ok(Value::String(
            envelope_with(&["op-4", "op-5"]).to_string(),
        )));

        let client = OperationsClient::new(
            reqwest::Client::new(),
            handle,
            browser,
            &test_config(),
        );

        let filter = OperationsFilter {
            size: 3,
            ..OperationsFilter::default()
        };
        let first = client.get_operations(&filter).await.unwrap();
        let second = client.get_operations(&filter.next_page()).await.unwrap();

        assert_eq!(second.offset, first.next_offset());
        let first_ids: Vec<_> = first.operations.iter().map(|o| &o.id).collect();
        for operation in &second.operations {
            assert!(!first_ids.contains(&&operation.id));
        }
    }

    #[tokio::test]
    async fn warm_up_requires_an_active_session() {
        let dir = tempfile::tempdir().unwrap();
        let handle = SessionHandle::new(ArtifactStore::new(dir.path().join("session.json")));
        let browser = Arc::new(ScriptedBrowser::new());

        let client = OperationsClient::new(
            reqwest::Client::new(),
            handle,
            browser,
            &test_config(),
        );

        let error = client.warm_up().await.unwrap_err();
        assert!(matches!(error, Error::SessionExpired { .. }));
    }

    #[test]
    fn unauthorized_status_is_an_application_rejection() {
        let outcome = interpret(
            Some(StatusCode::UNAUTHORIZED),
            b"",
            &OperationsFilter::default(),
        );
        assert!(matches!(outcome, Ok(Interpreted::Rejected)));

        let outcome = interpret(
            Some(StatusCode::OK),
            br#"{"success": false}"#,
            &OperationsFilter::default(),
        );
        assert!(matches!(outcome, Ok(Interpreted::Rejected)));
    }

    #[test]
    fn garbage_bodies_count_as_transport_faults() {
        let outcome = interpret(
            Some(StatusCode::OK),
            b"<html>bad gateway</html>",
            &OperationsFilter::default(),
        );
        assert!(outcome.is_err());
    }

    #[test]
    fn successful_envelope_becomes_a_page_echoing_the_query() {
        let filter = OperationsFilter {
            offset: 51,
            ..OperationsFilter::default()
        };
        let body = envelope_with(&["op-52"]).to_string();
        match interpret(Some(StatusCode::OK), body.as_bytes(), &filter) {
            Ok(Interpreted::Page(page)) => {
                assert_eq!(page.offset, 51);
                assert_eq!(page.size, 51);
                assert_eq!(page.operations[0].id, "op-52");
            }
            _ => panic!("expected a page"),
        }
    }
}
