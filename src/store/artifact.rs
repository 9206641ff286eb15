use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Routing identifiers the remote service pinned this session to.
///
/// The web node serves the authenticated pages and the warm-up endpoint;
/// the API node serves the operations listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingIds {
    pub web_node: String,
    pub api_node: String,
}

/// The full set of transport-level credentials needed to act as an
/// already-authenticated client.
///
/// An artifact is either whole or absent: it is only ever created in one
/// piece by the login capture and replaced in one piece by a refresh
/// commit. Maps are ordered so serialization is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionArtifact {
    /// Cookie name → value, harvested verbatim from observed traffic
    pub cookies: BTreeMap<String, String>,

    /// Header name → value, harvested verbatim from observed traffic
    pub headers: BTreeMap<String, String>,

    /// Client-local key/value state captured alongside the credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_storage: Option<BTreeMap<String, String>>,

    /// Nodes the session is pinned to, when discovery succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingIds>,

    pub captured_at: DateTime<Utc>,
}

impl SessionArtifact {
    pub fn new(cookies: BTreeMap<String, String>, headers: BTreeMap<String, String>) -> Self {
        Self {
            cookies,
            headers,
            local_storage: None,
            routing: None,
            captured_at: Utc::now(),
        }
    }

    /// Age of the capture. Clock skew clamps to zero.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.captured_at).to_std().unwrap_or_default()
    }

    pub fn is_older_than(&self, lifetime: Duration) -> bool {
        self.age() > lifetime
    }

    /// Render the cookie map as a single `Cookie` header value.
    pub fn cookie_header(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.cookies {
            if !out.is_empty() {
                out.push_str("; ");
            }
            out.push_str(name);
            out.push('=');
            out.push_str(value);
        }
        out
    }

    /// Replace the transport credentials while keeping local state and
    /// routing from the previous capture.
    pub fn refreshed(
        &self,
        cookies: BTreeMap<String, String>,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            cookies,
            headers,
            local_storage: self.local_storage.clone(),
            routing: self.routing.clone(),
            captured_at: Utc::now(),
        }
    }
}
