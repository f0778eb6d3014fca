//! Persisted identity of the remote REST API.
//!
//! The identity string is the only existence signal: empty means no remote
//! object is believed to exist.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Outcome of a read: whether the remote object still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// Identity binding between the desired configuration and the remote object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceState {
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut state = Self::default();
        state.bind(id);
        state
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_present(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn bind(&mut self, id: impl Into<String>) {
        self.id = id.into();
        self.updated_at = Some(Utc::now());
    }

    pub fn clear(&mut self) {
        self.id.clear();
        self.updated_at = Some(Utc::now());
    }
}

/// State file errors.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O: {0}")]
    Io(#[from] io::Error),

    #[error("state file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// JSON file holding a [`ResourceState`] between invocations.
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state; a missing file is the empty state.
    pub async fn load(&self) -> Result<ResourceState, StateError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file, starting empty");
                Ok(ResourceState::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the state via a temp file and rename.
    pub async fn save(&self, state: &ResourceState) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(state)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), id = %state.id, "State saved");
        Ok(())
    }
}
