//! Persisted state between cycles.
//!
//! One record holds the start detector state and the last emitted signal.
//! It is read once at the start of a cycle and written at most once at the
//! end.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::dedup::SignalIdentity;
use crate::start::DetectorState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub detector: DetectorState,
    #[serde(default)]
    pub last_emitted: Option<SignalIdentity>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where cycle state lives.
pub trait StateStore {
    /// Stored state; missing or unreadable state loads as the default.
    fn load(&self) -> PersistedState;

    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError>;
}

/// Pretty JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> PersistedState {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PersistedState::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state unreadable, starting fresh");
                return PersistedState::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "state corrupt, starting fresh");
            PersistedState::default()
        })
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

/// In-process store, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: PersistedState,
    saves: usize,
}

impl MemoryStore {
    pub fn new(state: PersistedState) -> Self {
        Self { state, saves: 0 }
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> PersistedState {
        self.state
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        self.state = *state;
        self.saves += 1;
        Ok(())
    }
}
