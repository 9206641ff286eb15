//! Boundary to the interactive login/browser collaborator.
//!
//! The core never depends on a particular automation engine; it only needs
//! the three capabilities below: drive a navigation, observe the next
//! outbound request matching a pattern, and execute a script in the live
//! page context. Implementations adapt whatever engine hosts the login
//! surface (a WebDriver session, a CDP connection, a remote relay).

#[cfg(test)]
pub mod fake;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    /// No request matching the pattern was observed within the timeout.
    #[error("no request matching {pattern:?} observed within {timeout:?}")]
    Timeout { pattern: String, timeout: Duration },

    /// The collaborator itself failed (crashed page, closed window, ...).
    #[error("collaborator failure: {0}")]
    Engine(String),
}

/// One outbound request observed in the collaborator's traffic, with its
/// response body once the exchange completed.
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub response_body: Option<Vec<u8>>,
}

/// The interactive collaborator the core drives during login and leans on
/// for the secondary transport.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the login surface to the given URL.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Block until the next outbound request whose URL contains `pattern`
    /// completes, or the timeout elapses.
    async fn wait_for_request(
        &self,
        pattern: &str,
        timeout: Duration,
    ) -> Result<CapturedRequest, BrowserError>;

    /// Execute a script in the live page context and return its value.
    ///
    /// The script runs with the page's own network stack and cookies, which
    /// is what makes this usable as a request relay.
    async fn execute(&self, script: &str) -> Result<serde_json::Value, BrowserError>;
}

/// Script returning the page's local storage as a JSON object.
pub(crate) const LOCAL_STORAGE_SCRIPT: &str = "\
(() => {
    const ls = {};
    for (let i = 0; i < localStorage.length; i++) {
        const key = localStorage.key(i);
        ls[key] = localStorage.getItem(key);
    }
    return ls;
})()";

/// Build an in-context relay of a JSON POST, returning the response text.
pub(crate) fn relay_script(url: &str, payload_json: &str) -> String {
    format!(
        "(async () => {{ \
         const response = await fetch({url:?}, {{ \
         method: 'POST', \
         credentials: 'include', \
         headers: {{ 'Content-Type': 'application/json' }}, \
         body: {payload_json:?} }}); \
         return await response.text(); }})()"
    )
}
