//! Connection manager for the active endpoint connection

use parking_lot::RwLock;
use qdesk_core::{Credentials, QdeskError, Result, SqlEndpoint};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::storage::{PersistedSession, SessionStore};

/// The connection every tree and query operation runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConnection {
    /// Logical target the connection was opened for
    pub target: String,

    /// Opaque id assigned by the endpoint
    pub id: String,
}

/// Manages the session's connection to the SQL endpoint
///
/// At most one target is active at a time. Older connections opened without
/// an intervening `close` stay in the mapping but are never used.
pub struct ConnectionManager {
    endpoint: Arc<dyn SqlEndpoint>,
    store: Arc<dyn SessionStore>,
    state: RwLock<PersistedSession>,
}

impl ConnectionManager {
    /// Create a manager with empty state. Call `restore` to pick up a
    /// previously persisted session.
    pub fn new(endpoint: Arc<dyn SqlEndpoint>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            endpoint,
            store,
            state: RwLock::new(PersistedSession::default()),
        }
    }

    /// The endpoint connections are opened against
    pub fn endpoint(&self) -> &Arc<dyn SqlEndpoint> {
        &self.endpoint
    }

    /// Reload mapping and active target from the durable store
    #[tracing::instrument(skip(self))]
    pub fn restore(&self) -> Result<Option<ActiveConnection>> {
        let session = self.store.load()?;
        tracing::info!(
            connections = session.connections.len(),
            active_target = ?session.active_target,
            "restored session state"
        );
        *self.state.write() = session;
        Ok(self.active())
    }

    /// The active connection, if the active target has a connection id
    pub fn active(&self) -> Option<ActiveConnection> {
        let state = self.state.read();
        let target = state.active_target.as_ref()?;
        let id = state.connections.get(target)?;
        Some(ActiveConnection {
            target: target.clone(),
            id: id.clone(),
        })
    }

    /// The active connection, or `NotConnected`
    pub fn require_active(&self) -> Result<ActiveConnection> {
        self.active().ok_or(QdeskError::NotConnected)
    }

    pub fn active_target(&self) -> Option<String> {
        self.state.read().active_target.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.active().is_some()
    }

    /// Connection id recorded for `target`
    pub fn connection_id(&self, target: &str) -> Option<String> {
        self.state.read().connections.get(target).cloned()
    }

    /// Snapshot of the target -> connection id mapping
    pub fn connections(&self) -> BTreeMap<String, String> {
        self.state.read().connections.clone()
    }

    /// Open a connection to `target` and make it the active one
    ///
    /// On failure nothing changes: the previous connection (if any) stays
    /// active.
    #[tracing::instrument(skip(self, credentials), fields(user = %credentials.user))]
    pub async fn open(&self, target: &str, credentials: &Credentials) -> Result<ActiveConnection> {
        tracing::info!("opening connection");
        let id = self
            .endpoint
            .open_connection(target, credentials)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to open connection");
                e
            })?;

        {
            let mut state = self.state.write();
            state.connections.insert(target.to_string(), id.clone());
            state.active_target = Some(target.to_string());
            self.persist(&state);
        }

        tracing::info!(connection_id = %id, "connection established");
        Ok(ActiveConnection {
            target: target.to_string(),
            id,
        })
    }

    /// Close the active connection
    ///
    /// Local state (mapping and active target, in memory and in the store) is
    /// cleared unconditionally, before the remote teardown is attempted.
    /// Returns the connection that was active, if any; no remote call is made
    /// when none was. An `Err` means only the remote teardown failed.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) -> Result<Option<ActiveConnection>> {
        let closed = {
            let mut state = self.state.write();
            let closed = state.active_target.as_ref().and_then(|target| {
                state.connections.get(target).map(|id| ActiveConnection {
                    target: target.clone(),
                    id: id.clone(),
                })
            });
            *state = PersistedSession::default();
            closed
        };

        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }

        let Some(conn) = closed else {
            tracing::debug!("no active connection to close");
            return Ok(None);
        };

        tracing::info!(target_name = %conn.target, connection_id = %conn.id, "closing connection");
        if let Err(e) = self.endpoint.close_connection(&conn.id).await {
            tracing::warn!(error = %e, "remote close failed, local state already cleared");
            return Err(e);
        }
        Ok(Some(conn))
    }

    /// Replace the active connection with one to `target`
    ///
    /// The new connection is opened first; only when that succeeds is the
    /// previous one dropped from the mapping and closed (best-effort). A
    /// failed switch leaves the previous connection active.
    #[tracing::instrument(skip(self, credentials), fields(user = %credentials.user))]
    pub async fn switch_target(
        &self,
        target: &str,
        credentials: &Credentials,
    ) -> Result<ActiveConnection> {
        let id = self
            .endpoint
            .open_connection(target, credentials)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to open connection for target switch");
                e
            })?;

        let previous = {
            let mut state = self.state.write();
            let previous = state.active_target.take().and_then(|old_target| {
                if old_target == target {
                    state.connections.get(&old_target).cloned()
                } else {
                    state.connections.remove(&old_target)
                }
            });
            state.connections.insert(target.to_string(), id.clone());
            state.active_target = Some(target.to_string());
            self.persist(&state);
            previous
        };

        if let Some(old_id) = previous.filter(|old_id| *old_id != id) {
            if let Err(e) = self.endpoint.close_connection(&old_id).await {
                tracing::warn!(connection_id = %old_id, error = %e, "failed to close previous connection");
            }
        }

        tracing::info!(connection_id = %id, "switched active target");
        Ok(ActiveConnection {
            target: target.to_string(),
            id,
        })
    }

    fn persist(&self, state: &PersistedSession) {
        // The connection is live remotely either way; a storage failure only
        // costs the ability to resume after a reload.
        if let Err(e) = self.store.save(state) {
            tracing::error!(error = %e, "failed to persist session state");
        }
    }
}
