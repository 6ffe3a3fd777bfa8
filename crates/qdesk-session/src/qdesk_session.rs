//! qdesk Session - Client-side SQL workbench session manager
//!
//! `WorkbenchSession` ties together the connection lifecycle, the lazily
//! loaded schema tree with its completion index, and the query result slots,
//! all driven against a remote SQL endpoint.
//!
//! ```ignore
//! let settings = SessionSettings::load()?;
//! let session = WorkbenchSession::from_settings(&settings, Arc::new(LogNotifier))?;
//! session.open("server1", &Credentials::new("admin", "secret")).await?;
//! let shop = session.find("shop").ok_or(SessionError::NotConnected)?;
//! session.expand(shop).await?;
//! session.preview("shop.orders").await?;
//! ```

mod error;
pub mod logging;
mod session;
mod settings;

pub use error::{ErrorClass, SessionError, SessionResult};
pub use session::WorkbenchSession;
pub use settings::{
    EndpointSettings, LoggingSettings, QuerySettings, SessionSettings, StorageSettings,
    TreeSettings, config_dir, data_dir, session_file,
};

// Re-export the types callers need to drive a session
pub use qdesk_connection::{
    ActiveConnection, FileSessionStore, MemorySessionStore, PersistedSession, SessionStore,
};
pub use qdesk_core::{
    BroadcastNotifier, Credentials, LogNotifier, Notification, NotificationLevel, Notifier,
    QdeskError, ResultSet, SharedResultSet, SqlEndpoint, TableRef, TargetRef,
};
pub use qdesk_query::{QueryMode, SlotKind, SlotOrdering, SlotSnapshot, SlotUpdate};
pub use qdesk_schema::{CompletionEntry, FetchOutcome, NodeKey, NodeKind, SchemaNode, SchemaNodeView};
