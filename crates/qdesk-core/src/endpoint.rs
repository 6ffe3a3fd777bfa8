//! Remote SQL endpoint contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{QueryResults, ResultSet, Result, TargetRef};

/// Credentials sent when opening a connection
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,

    pub password: String,

    /// Default database for the connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Connection idle timeout in seconds, enforced by the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            db: None,
            timeout: None,
        }
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("db", &self.db)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The remote SQL execution endpoint
///
/// The session manager is a client of this trait. Errors are opaque: callers
/// only distinguish success from failure.
#[async_trait]
pub trait SqlEndpoint: Send + Sync {
    /// Open a connection to `target`, returning the connection id assigned
    /// by the endpoint
    async fn open_connection(&self, target: &str, credentials: &Credentials) -> Result<String>;

    /// Tear down a connection
    async fn close_connection(&self, connection_id: &str) -> Result<()>;

    /// Execute SQL text on a connection
    async fn execute(&self, connection_id: &str, sql: &str) -> Result<QueryResults>;

    /// List the targets of a resource type (e.g. "servers")
    async fn list_targets(&self, resource_type: &str) -> Result<Vec<TargetRef>>;

    /// Execute SQL text and keep only the first result set
    async fn query_first(&self, connection_id: &str, sql: &str) -> Result<ResultSet> {
        self.execute(connection_id, sql).await?.into_first()
    }
}
