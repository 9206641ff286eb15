//! Stateless liveness probe.
//!
//! The remote treats the probe itself as session activity, so probing a
//! live session is side-effect-free beyond the extension it naturally
//! grants.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use tracing::{debug, warn};

use crate::config::Endpoints;
use crate::store::SessionArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid,
}

/// The remote's canonical "alive" answer: `{"code":0}` in the body.
pub(crate) fn sentinel_ok(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("code").and_then(|code| code.as_i64()))
        == Some(0)
}

/// Turn the artifact's captured credentials into request headers.
///
/// Harvested-verbatim captures can include names the HTTP layer rejects
/// (HTTP/2 pseudo-headers and the like); those are skipped, not fatal.
pub(crate) fn artifact_headers(artifact: &SessionArtifact) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in &artifact.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %name, "skipping unusable captured header"),
        }
    }
    if !artifact.cookies.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&artifact.cookie_header()) {
            map.insert(COOKIE, value);
        }
    }
    map
}

/// Ask the remote whether the artifact is still usable.
///
/// Anything other than an HTTP success carrying the sentinel — including
/// a transport failure or the timeout elapsing — is `Invalid`, never a
/// hang.
pub async fn probe(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    artifact: &SessionArtifact,
    timeout: Duration,
) -> Validity {
    let response = http
        .post(&endpoints.warmup_url)
        .headers(artifact_headers(artifact))
        .timeout(timeout)
        .send()
        .await;

    match response {
        Ok(response) if response.status().is_success() => match response.bytes().await {
            Ok(body) if sentinel_ok(&body) => {
                debug!("session probe: valid");
                Validity::Valid
            }
            _ => {
                debug!("session probe: sentinel missing");
                Validity::Invalid
            }
        },
        Ok(response) => {
            debug!(status = %response.status(), "session probe rejected");
            Validity::Invalid
        }
        Err(error) => {
            debug!(error = %error, "session probe transport failure");
            Validity::Invalid
        }
    }
}
