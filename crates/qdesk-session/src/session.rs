//! The workbench session

use qdesk_client::HttpEndpoint;
use qdesk_connection::{
    ActiveConnection, ConnectionManager, FileSessionStore, MemorySessionStore, SessionStore,
    TargetCatalog,
};
use qdesk_core::{Credentials, Notification, Notifier, QdeskError, SqlEndpoint, TableRef, TargetRef};
use qdesk_query::{QueryMode, QueryTracker, SlotKind, SlotOrdering, SlotSnapshot, SlotUpdate};
use qdesk_schema::{CompletionEntry, FetchOutcome, NodeKey, SchemaLoader, SchemaNode, SchemaNodeView};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{SessionError, SessionResult};
use crate::settings::SessionSettings;

/// One user's workbench: a connection, its schema tree and query results
///
/// Every operation checks for an active connection first and fails with
/// `NotConnected` without touching the endpoint when there is none.
/// Operation-local failures are logged, published as warnings and returned;
/// they never tear the connection down. A failed root load does.
pub struct WorkbenchSession {
    connections: ConnectionManager,
    schema: SchemaLoader,
    queries: QueryTracker,
    targets: TargetCatalog,
    notifier: Arc<dyn Notifier>,
}

impl WorkbenchSession {
    /// Build a session and restore any connection persisted in `store`
    ///
    /// The tree is not persisted; call `resume` to reload it for a restored
    /// connection.
    pub fn new(
        endpoint: Arc<dyn SqlEndpoint>,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        settings: &SessionSettings,
    ) -> Self {
        let min_fetch_duration = settings.tree.min_fetch_duration();
        let session = Self {
            connections: ConnectionManager::new(endpoint, store),
            schema: SchemaLoader::new(min_fetch_duration),
            queries: QueryTracker::with_min_fetch_duration(
                settings.query.slot_ordering,
                min_fetch_duration,
            ),
            targets: TargetCatalog::new(),
            notifier,
        };

        if let Err(e) = session.connections.restore() {
            tracing::warn!(error = %e, "failed to restore session, starting disconnected");
        }
        session
    }

    /// Build a session talking HTTP to the configured endpoint
    pub fn from_settings(
        settings: &SessionSettings,
        notifier: Arc<dyn Notifier>,
    ) -> SessionResult<Self> {
        let endpoint = HttpEndpoint::with_timeout(
            settings.endpoint.base_url.clone(),
            settings.endpoint.request_timeout(),
        )
        .map_err(SessionError::Setup)?;

        let store: Arc<dyn SessionStore> = match &settings.storage.session_file {
            Some(path) => Arc::new(FileSessionStore::new(path.clone())),
            None => Arc::new(MemorySessionStore::new()),
        };

        Ok(Self::new(Arc::new(endpoint), store, notifier, settings))
    }

    // ============ Connection lifecycle ============

    /// Open a connection to `target`, make it active and load its tree
    ///
    /// A connection opened earlier to another target stays in the mapping
    /// but is no longer used. If the tree cannot be loaded the new connection
    /// is closed again and `ConnectionLost` is returned.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn open(
        &self,
        target: &str,
        credentials: &Credentials,
    ) -> SessionResult<ActiveConnection> {
        let conn = match self.connections.open(target, credentials).await {
            Ok(conn) => conn,
            Err(e) => {
                self.notifier.notify(Notification::error("Connection failed"));
                return Err(SessionError::ConnectionFailed(e));
            }
        };

        self.notifier.notify(Notification::success("Connection successful"));
        self.activated().await?;
        Ok(conn)
    }

    /// Replace the active connection with one to `target`
    ///
    /// The previous connection is closed only after the new one is open; a
    /// failed switch leaves it, and its tree, in place.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn switch_target(
        &self,
        target: &str,
        credentials: &Credentials,
    ) -> SessionResult<ActiveConnection> {
        let conn = match self.connections.switch_target(target, credentials).await {
            Ok(conn) => conn,
            Err(e) => {
                self.notifier.notify(Notification::error("Connection failed"));
                return Err(SessionError::ConnectionFailed(e));
            }
        };

        self.notifier.notify(Notification::success("Connection successful"));
        self.activated().await?;
        Ok(conn)
    }

    /// Close the active connection and discard everything derived from it
    ///
    /// Local state is cleared even when the result is `CleanupFailed`.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) -> SessionResult<Option<ActiveConnection>> {
        self.invalidate();
        self.connections
            .close()
            .await
            .map_err(SessionError::CleanupFailed)
    }

    /// Reload the tree for a connection restored from the store
    ///
    /// Does nothing when no connection was restored.
    pub async fn resume(&self) -> SessionResult<()> {
        if !self.connections.is_connected() {
            tracing::debug!("nothing to resume");
            return Ok(());
        }
        self.load_root().await
    }

    async fn activated(&self) -> SessionResult<()> {
        self.invalidate();
        self.load_root().await
    }

    fn invalidate(&self) {
        self.schema.reset();
        self.queries.reset();
    }

    // ============ Schema tree ============

    /// Load the database list, replacing the tree and the completion index
    ///
    /// A failure here means the connection is gone: it is closed, the user is
    /// told, and `ConnectionLost` is returned.
    #[tracing::instrument(skip(self))]
    pub async fn load_root(&self) -> SessionResult<()> {
        let conn = self.active()?;
        match self
            .schema
            .load_root(self.connections.endpoint().as_ref(), &conn.id)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::error!(
                    connection_id = %conn.id,
                    error = %e,
                    "root load failed, closing connection"
                );
                // Only tear down the connection the load was issued against
                if self.connections.active().as_ref() == Some(&conn) {
                    if let Err(cleanup) = self.close().await {
                        tracing::warn!(
                            error = %cleanup,
                            class = ?cleanup.class(),
                            "cleanup after lost connection failed"
                        );
                    }
                }
                self.notifier.notify(Notification::error("Connection timed out"));
                Err(SessionError::ConnectionLost(e))
            }
        }
    }

    /// Fetch the children of a schema or table node
    #[tracing::instrument(skip(self))]
    pub async fn expand(&self, key: NodeKey) -> SessionResult<FetchOutcome> {
        let conn = self.active()?;
        self.schema
            .expand(self.connections.endpoint().as_ref(), &conn.id, key)
            .await
            .map_err(|e| self.operation_failed(e, SessionError::SchemaLoadFailed))
    }

    /// Fetch the children of the node with dotted id `node_id`
    pub async fn expand_id(&self, node_id: &str) -> SessionResult<FetchOutcome> {
        self.active()?;
        let key = self
            .schema
            .find(node_id)
            .ok_or_else(|| SessionError::InvalidNode(format!("no node with id '{}'", node_id)))?;
        self.expand(key).await
    }

    pub fn tree_loading(&self) -> bool {
        self.schema.tree_loading()
    }

    pub fn is_expanding(&self, key: NodeKey) -> bool {
        self.schema.is_expanding(key)
    }

    pub fn roots(&self) -> Vec<NodeKey> {
        self.schema.roots()
    }

    pub fn node(&self, key: NodeKey) -> Option<SchemaNode> {
        self.schema.node(key)
    }

    pub fn children(&self, key: NodeKey) -> Vec<SchemaNode> {
        self.schema.children(key)
    }

    pub fn find(&self, node_id: &str) -> Option<NodeKey> {
        self.schema.find(node_id)
    }

    pub fn tree_view(&self) -> Vec<SchemaNodeView> {
        self.schema.tree_view()
    }

    pub fn completion_entries(&self) -> Vec<CompletionEntry> {
        self.schema.completion_entries()
    }

    // ============ Queries ============

    /// Load every row of `table_id` (`db.table`) into the preview slot
    #[tracing::instrument(skip(self))]
    pub async fn preview(&self, table_id: &str) -> SessionResult<SlotUpdate> {
        let conn = self.active()?;
        let table = TableRef::parse(table_id)
            .map_err(|e| SessionError::local(e, SessionError::QueryFailed))?;
        self.queries
            .preview(self.connections.endpoint().as_ref(), &conn.id, &table)
            .await
            .map_err(|e| self.operation_failed(e, SessionError::QueryFailed))
    }

    /// Load the structure of `table_id` (`db.table`) into the describe slot
    #[tracing::instrument(skip(self))]
    pub async fn describe(&self, table_id: &str) -> SessionResult<SlotUpdate> {
        let conn = self.active()?;
        let table = TableRef::parse(table_id)
            .map_err(|e| SessionError::local(e, SessionError::QueryFailed))?;
        self.queries
            .describe(self.connections.endpoint().as_ref(), &conn.id, &table)
            .await
            .map_err(|e| self.operation_failed(e, SessionError::QueryFailed))
    }

    /// Run `sql_text` as given into the query slot
    #[tracing::instrument(skip(self, sql_text))]
    pub async fn run_query(&self, sql_text: &str) -> SessionResult<SlotUpdate> {
        let conn = self.active()?;
        self.queries
            .run_query(self.connections.endpoint().as_ref(), &conn.id, sql_text)
            .await
            .map_err(|e| self.operation_failed(e, SessionError::QueryFailed))
    }

    /// Empty the preview and describe slots
    pub fn clear_preview(&self) {
        self.queries.clear_preview();
    }

    pub fn slot(&self, kind: SlotKind) -> SlotSnapshot {
        self.queries.slot(kind)
    }

    pub fn slot_ordering(&self) -> SlotOrdering {
        self.queries.ordering()
    }

    pub fn query_mode(&self) -> QueryMode {
        self.queries.mode()
    }

    pub fn set_query_mode(&self, mode: QueryMode) {
        self.queries.set_mode(mode);
    }

    // ============ Targets ============

    /// List candidate targets of `resource_type` and remember them
    ///
    /// Failure is only logged; the catalog keeps what it had.
    pub async fn fetch_target_names(&self, resource_type: &str) -> SessionResult<Vec<TargetRef>> {
        self.targets
            .fetch(self.connections.endpoint().as_ref(), resource_type)
            .await
            .map_err(SessionError::TargetListFailed)
    }

    pub fn target_names(&self) -> BTreeMap<String, Vec<TargetRef>> {
        self.targets.all()
    }

    // ============ Connection state ============

    pub fn active_connection(&self) -> Option<ActiveConnection> {
        self.connections.active()
    }

    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    /// Target name -> connection id for every connection opened this session
    pub fn connections(&self) -> BTreeMap<String, String> {
        self.connections.connections()
    }

    fn active(&self) -> SessionResult<ActiveConnection> {
        self.connections
            .require_active()
            .map_err(|_| SessionError::NotConnected)
    }

    fn operation_failed(
        &self,
        error: QdeskError,
        wrap: fn(QdeskError) -> SessionError,
    ) -> SessionError {
        let error = SessionError::local(error, wrap);
        if matches!(error, SessionError::InvalidNode(_)) {
            tracing::debug!(error = %error, "rejected operation");
            return error;
        }
        tracing::warn!(error = %error, "operation failed");
        self.notifier.notify(Notification::warning(error.to_string()));
        error
    }
}
