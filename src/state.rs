//! Persisted per-application window state.
//!
//! The snapshot maps an application's display name to the tags and
//! floating flag its windows should come back with.  It is written
//! eagerly after every tag move or float toggle and consulted once per
//! newly managed client, where it outranks the rule table.
//!
//! # File format
//!
//! ```json
//! {
//!   "windows": {
//!     "Ghostty":  { "tags": 1, "floating": false },
//!     "Calculator": { "tags": 16, "floating": true }
//!   }
//! }
//! ```

use crate::tags::TagMask;
use crate::traits::StateStore;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Saved placement for one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// Saved tag mask; the empty mask means "no tag preference".
    #[serde(default)]
    pub tags: TagMask,
    #[serde(default)]
    pub floating: bool,
}

/// The full persisted mapping, keyed by application display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    windows: BTreeMap<String, ClientState>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn get(&self, app: &str) -> Option<ClientState> {
        self.windows.get(app).copied()
    }

    /// Record the state for an application, replacing any previous entry
    /// (last writer wins).
    pub fn set(&mut self, app: impl Into<String>, state: ClientState) {
        self.windows.insert(app.into(), state);
    }
}

/// Error from reading or writing the state file.  Internal only — the
/// [`StateStore`] contract converts every failure into "no saved state".
#[derive(Debug, thiserror::Error)]
#[error("state file error: {0}")]
struct StateFileError(String);

/// [`StateStore`] backed by a JSON file.
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_load(&self) -> Result<StateSnapshot, StateFileError> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| StateFileError(format!("read {}: {}", self.path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| StateFileError(format!("parse {}: {}", self.path.display(), e)))
    }

    fn try_store(&self, snapshot: &StateSnapshot) -> Result<(), StateFileError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StateFileError(format!("encode: {}", e)))?;
        std::fs::write(&self.path, json)
            .map_err(|e| StateFileError(format!("write {}: {}", self.path.display(), e)))
    }
}

impl StateStore for JsonStateFile {
    fn load(&self) -> StateSnapshot {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("no saved state ({})", e);
                StateSnapshot::new()
            }
        }
    }

    fn store(&self, snapshot: &StateSnapshot) {
        if let Err(e) = self.try_store(snapshot) {
            warn!("failed to persist window state: {}", e);
        }
    }
}
