//! Crate-wide error taxonomy.
//!
//! Every failure a caller can act on maps to one variant:
//!
//! - `AuthenticationFailed`: the interactive flow stalled — re-invoke it
//! - `SessionExpired`: the remote rejected the credential — re-authenticate
//! - `WarmUpFailed`: a probe missed the success sentinel — contributing
//!   signal toward expiry, recoverable
//! - `Transport`: both delivery paths failed at the network layer — retry
//!   later
//! - `Filter`: malformed query, never sent to the remote
//! - `Persistence`: artifact store unreadable — downgraded to "no artifact"
//!   by callers

use thiserror::Error;

use crate::api::filter::FilterError;
use crate::auth::login::LoginStage;
use crate::browser::BrowserError;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The interactive login flow did not reach the named stage within its
    /// timeout. Never retried silently; the caller re-invokes the flow.
    #[error("authentication flow stalled at {stage}: {reason}")]
    AuthenticationFailed { stage: LoginStage, reason: String },

    /// The remote service rejected the current artifact at the application
    /// level. Retrying the same read with a known-bad credential cannot
    /// succeed, so this escalates immediately.
    #[error("session rejected by remote service at {endpoint}")]
    SessionExpired { endpoint: String },

    /// The warm-up endpoint answered without the `{"code":0}` sentinel.
    #[error("warm-up exchange at {endpoint} did not return the success sentinel")]
    WarmUpFailed { endpoint: String },

    /// Both the primary and the secondary transport failed at the network
    /// layer for the same logical request.
    #[error("both transports failed for {endpoint}: primary: {primary}; secondary: {secondary}")]
    Transport {
        endpoint: String,
        primary: String,
        secondary: String,
    },

    #[error("filter validation failed: {0}")]
    Filter(#[from] FilterError),

    #[error("artifact store failure: {0}")]
    Persistence(#[from] StoreError),
}

impl Error {
    /// Shorthand for a login stage that stalled on a collaborator error.
    pub(crate) fn auth_failed(stage: LoginStage, cause: BrowserError) -> Self {
        Error::AuthenticationFailed {
            stage,
            reason: cause.to_string(),
        }
    }
}
