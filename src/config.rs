//! Client configuration.
//!
//! All timing knobs here describe empirically observed properties of the
//! remote service, not protocol guarantees, so every one of them is a
//! configurable field with the observed value as its default.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application name used for the default artifact location
const APP_NAME: &str = "sberops";

/// Artifact file name in the cache directory
const ARTIFACT_FILE: &str = "session.json";

/// Web node the remote assigns fresh sessions to when none is discovered
const DEFAULT_WEB_NODE: &str = "web1";

/// API node serving the operations listing endpoint
pub(crate) const DEFAULT_API_NODE: &str = "web-node1";

/// Interactive login entry point
pub const LOGIN_URL: &str = "https://online.sberbank.ru/CSAFront/index.do";

/// Substring identifying the authorized landing navigation
pub(crate) const LANDING_PATTERN: &str = "/main";

/// Substring identifying a warm-up exchange in observed traffic
pub(crate) const WARMUP_PATTERN: &str = "/api/warmUpSession";

/// Substring identifying the telemetry report call harvested at login
pub(crate) const REPORT_PATTERN: &str = "/api/log/report";

/// Remote endpoints consumed by the client.
///
/// The host part depends on the web/API nodes the remote service pinned the
/// session to; [`Endpoints::for_nodes`] rebuilds the set after node
/// discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub login_url: String,
    pub landing_url: String,
    pub warmup_url: String,
    pub report_url: String,
    pub operations_url: String,
}

impl Endpoints {
    /// Build the endpoint set for a specific web node / API node pair.
    pub fn for_nodes(web_node: &str, api_node: &str) -> Self {
        Self {
            login_url: LOGIN_URL.to_string(),
            landing_url: format!("https://{web_node}.online.sberbank.ru/main"),
            warmup_url: format!("https://{web_node}.online.sberbank.ru/api/warmUpSession"),
            report_url: format!("https://{web_node}.online.sberbank.ru/api/log/report"),
            operations_url: format!(
                "https://{api_node}.online.sberbank.ru/uoh-bh/v1/operations/list"
            ),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::for_nodes(DEFAULT_WEB_NODE, DEFAULT_API_NODE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to a previously persisted artifact. Absent means the default
    /// cache location; a path that does not exist forces a fresh login.
    pub artifact_path: Option<PathBuf>,

    /// How long the user gets to complete the interactive login
    pub login_timeout: Duration,

    /// How long to wait for the telemetry report call after landing
    pub capture_timeout: Duration,

    /// Timeout for the liveness probe against the warm-up endpoint
    pub probe_timeout: Duration,

    /// A successful warm-up exchange must be seen at least once per window
    /// or the remote unilaterally expires the session (observed: ~160 s)
    pub refresh_window: Duration,

    /// Observed lifetime of an untouched remote session (~15 min); stored
    /// artifacts older than this skip the probe and go straight to login
    pub session_lifetime: Duration,

    /// Bounds for the randomized delay between simulated-activity actions
    pub activity_min: Duration,
    pub activity_max: Duration,

    /// Per-request timeout on the primary transport
    pub request_timeout: Duration,

    /// Retry bound for transport-class failures before falling back
    pub max_transport_retries: u32,

    /// Initial backoff between primary-transport retries (doubles each try)
    pub initial_backoff: Duration,

    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifact_path: None,
            login_timeout: Duration::from_secs(240),
            capture_timeout: Duration::from_secs(100),
            probe_timeout: Duration::from_secs(15),
            refresh_window: Duration::from_secs(160),
            session_lifetime: Duration::from_secs(15 * 60),
            activity_min: Duration::from_secs(30),
            activity_max: Duration::from_secs(180),
            request_timeout: Duration::from_secs(30),
            max_transport_retries: 2,
            initial_backoff: Duration::from_millis(1000),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Resolve where the session artifact lives on disk.
    ///
    /// An explicit `artifact_path` wins; otherwise the platform cache
    /// directory, falling back to `./cache` when none is available.
    pub fn resolve_artifact_path(&self) -> PathBuf {
        if let Some(ref path) = self.artifact_path {
            return path.clone();
        }
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("./cache"))
            .join(APP_NAME)
            .join(ARTIFACT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_use_observed_nodes() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.warmup_url,
            "https://web1.online.sberbank.ru/api/warmUpSession"
        );
        assert_eq!(
            endpoints.operations_url,
            "https://web-node1.online.sberbank.ru/uoh-bh/v1/operations/list"
        );
    }

    #[test]
    fn endpoints_follow_discovered_nodes() {
        let endpoints = Endpoints::for_nodes("web7", "web-node3");
        assert_eq!(
            endpoints.landing_url,
            "https://web7.online.sberbank.ru/main"
        );
        assert_eq!(
            endpoints.operations_url,
            "https://web-node3.online.sberbank.ru/uoh-bh/v1/operations/list"
        );
        // login entry never depends on the session's nodes
        assert_eq!(endpoints.login_url, LOGIN_URL);
    }

    #[test]
    fn explicit_artifact_path_wins() {
        let config = Config {
            artifact_path: Some(PathBuf::from("/tmp/session.json")),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_artifact_path(),
            PathBuf::from("/tmp/session.json")
        );
    }
}
