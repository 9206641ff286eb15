//! Durable persistence for the session artifact.
//!
//! One artifact record per logical session, written atomically so a loader
//! never observes a partial write. A corrupt or unreadable backing file is
//! reported as a [`StoreError`] and downgraded to "absent" by callers.

pub mod artifact;

pub use artifact::{RoutingIds, SessionArtifact};

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access artifact file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed artifact store.
///
/// `save` writes to a temp sibling and renames it into place, so `load`
/// sees either the previous artifact or the new one, never a mix.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted artifact. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<SessionArtifact>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let artifact = serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "session artifact loaded");
        Ok(Some(artifact))
    }

    /// Persist the artifact atomically.
    pub fn save(&self, artifact: &SessionArtifact) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(artifact).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!(path = %self.path.display(), "session artifact saved");
        Ok(())
    }

    /// Remove the persisted artifact, if any.
    pub fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
