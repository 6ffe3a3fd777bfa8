//! Durable session state
//!
//! Only the connection mapping and the active target are persisted. The
//! schema tree and completion index are always rebuilt from the endpoint.

use parking_lot::Mutex;
use qdesk_core::{QdeskError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What survives a reload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSession {
    /// Target name -> connection id
    pub connections: BTreeMap<String, String>,

    /// Currently active target
    pub active_target: Option<String>,
}

impl PersistedSession {
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty() && self.active_target.is_none()
    }
}

/// Write-through storage for `PersistedSession`
///
/// Calls are synchronous so a write completes together with the in-memory
/// mutation that caused it.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<PersistedSession>;

    fn save(&self, session: &PersistedSession) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Store that lives as long as the process
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `session`, as if written earlier
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    /// Raw stored value, `None` when nothing has been written or it was cleared
    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.session.lock().clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<PersistedSession> {
        Ok(self.session.lock().clone().unwrap_or_default())
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.lock() = None;
        Ok(())
    }
}

/// Store backed by a JSON file
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    #[tracing::instrument(skip(self), fields(path = ?self.path))]
    fn load(&self) -> Result<PersistedSession> {
        if !self.path.exists() {
            tracing::debug!("no session file, starting fresh");
            return Ok(PersistedSession::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!("Failed to parse session file, starting fresh: {}", e);
                Ok(PersistedSession::default())
            }
        }
    }

    #[tracing::instrument(skip(self, session), fields(path = ?self.path))]
    fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(connections = session.connections.len(), "session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QdeskError::Storage(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
