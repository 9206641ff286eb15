//! One-shot interactive login flow.
//!
//! The flow is a state machine driven purely by collaborator events; it
//! never inspects or stores the user's credentials. The user completes the
//! login surface themselves, and the flow advances on observed navigations
//! and requests:
//!
//! `AwaitingCredentials` → `AuthorizedRedirect` → `NodeDiscovery` →
//! `ArtifactCaptured`
//!
//! The credential set is whatever the authenticated page's own telemetry
//! report call carries — every header and cookie on that request, taken
//! verbatim, is the canonical minimal artifact.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::browser::{BrowserSession, LOCAL_STORAGE_SCRIPT};
use crate::config::{Config, DEFAULT_API_NODE, LANDING_PATTERN, REPORT_PATTERN};
use crate::error::{Error, Result};
use crate::session::{SessionHandle, SessionState};
use crate::store::{RoutingIds, SessionArtifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    AwaitingCredentials,
    AuthorizedRedirect,
    NodeDiscovery,
    ArtifactCaptured,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoginStage::AwaitingCredentials => "awaiting-credentials",
            LoginStage::AuthorizedRedirect => "authorized-redirect",
            LoginStage::NodeDiscovery => "node-discovery",
            LoginStage::ArtifactCaptured => "artifact-captured",
        };
        f.write_str(label)
    }
}

/// Run the flow to completion: capture a fresh artifact, commit it, and
/// move the session to `Active`. A timeout at any stage surfaces as
/// `AuthenticationFailed` and is never silently retried.
pub(crate) async fn run(
    browser: &dyn BrowserSession,
    handle: &SessionHandle,
    config: &Config,
) -> Result<SessionArtifact> {
    handle.set_state(SessionState::Authenticating);
    match drive(browser, handle, config).await {
        Ok(artifact) => {
            handle.set_state(SessionState::Active);
            info!("login complete; session active");
            Ok(artifact)
        }
        Err(error) => {
            handle.set_state(SessionState::Unauthenticated);
            Err(error)
        }
    }
}

async fn drive(
    browser: &dyn BrowserSession,
    handle: &SessionHandle,
    config: &Config,
) -> Result<SessionArtifact> {
    browser
        .navigate(&config.endpoints.login_url)
        .await
        .map_err(|e| Error::auth_failed(LoginStage::AwaitingCredentials, e))?;
    info!(timeout = ?config.login_timeout, "waiting for the user to complete the login surface");

    let landing = browser
        .wait_for_request(LANDING_PATTERN, config.login_timeout)
        .await
        .map_err(|e| Error::auth_failed(LoginStage::AwaitingCredentials, e))?;
    debug!(url = %landing.url, "authorized landing observed");

    let routing = discover_nodes(&landing.url);
    match &routing {
        Some(routing) => {
            debug!(web = %routing.web_node, api = %routing.api_node, "session nodes discovered")
        }
        None => debug!(url = %landing.url, "landing host did not reveal session nodes"),
    }

    let report = browser
        .wait_for_request(REPORT_PATTERN, config.capture_timeout)
        .await
        .map_err(|e| Error::auth_failed(LoginStage::ArtifactCaptured, e))?;
    if report.cookies.is_empty() && report.headers.is_empty() {
        return Err(Error::AuthenticationFailed {
            stage: LoginStage::ArtifactCaptured,
            reason: "captured report call carried no credentials".to_string(),
        });
    }
    debug!(
        cookies = report.cookies.len(),
        headers = report.headers.len(),
        "credential set captured from report call"
    );

    // best-effort; an artifact without local state is still whole
    let local_storage = match browser.execute(LOCAL_STORAGE_SCRIPT).await {
        Ok(value) => serde_json::from_value::<BTreeMap<String, String>>(value).ok(),
        Err(error) => {
            debug!(error = %error, "local storage capture failed");
            None
        }
    };

    let mut artifact = SessionArtifact::new(report.cookies, report.headers);
    artifact.local_storage = local_storage;
    artifact.routing = routing;
    handle.commit(artifact.clone()).await?;
    Ok(artifact)
}

/// Extract the session's routing nodes from the authorized landing URL.
///
/// The web node is the landing host's first label. The API node is not
/// visible in login traffic; it follows the web node's index, with the
/// well-known default when the web node carries none.
fn discover_nodes(url: &str) -> Option<RoutingIds> {
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?
        .split('/')
        .next()?;
    if !host.ends_with(".online.sberbank.ru") {
        return None;
    }
    let web_node = host.split('.').next()?;
    if web_node.is_empty() {
        return None;
    }
    let index: String = web_node.chars().filter(char::is_ascii_digit).collect();
    let api_node = if index.is_empty() {
        DEFAULT_API_NODE.to_string()
    } else {
        format!("web-node{index}")
    };
    Some(RoutingIds {
        web_node: web_node.to_string(),
        api_node,
    })
}
