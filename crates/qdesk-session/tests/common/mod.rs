//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use qdesk_session::{
    Credentials, MemorySessionStore, Notification, NotificationLevel, Notifier, QdeskError,
    ResultSet, SessionSettings, SessionStore, SqlEndpoint, TargetRef, WorkbenchSession,
};
use qdesk_core::{QueryResults, Result};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Mock SQL endpoint for driving a session without a server.
///
/// Queries are answered from SQL-pattern-based responses: the first
/// registered pattern contained in the statement wins, so register specific
/// patterns before general ones. Patterns marked as failing answer with an
/// error, and a gate holds the next matching call until it is released.
#[derive(Default)]
pub struct MockEndpoint {
    next_id: Mutex<u32>,
    failing_targets: Mutex<HashSet<String>>,
    fail_close: Mutex<bool>,
    responses: Mutex<Vec<(String, ResultSet)>>,
    failing_patterns: Mutex<Vec<String>>,
    gates: Mutex<Vec<(String, oneshot::Receiver<()>)>>,
    targets: Mutex<Vec<TargetRef>>,
    /// Log of all SQL executed, with the connection id it ran on
    pub query_log: Mutex<Vec<(String, String)>>,
    pub opened: Mutex<Vec<String>>,
    pub closed: Mutex<Vec<String>>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint knowing databases `shop` (tables `orders`, `items`) and `crm`
    /// (table `contacts`)
    pub fn with_sample_schema() -> Self {
        let endpoint = Self::new();
        endpoint.respond("SHOW DATABASES", names("Database", &["shop", "crm"]));
        endpoint.respond("SHOW TABLES FROM `shop`", names("Tables_in_shop", &["orders", "items"]));
        endpoint.respond("SHOW TABLES FROM `crm`", names("Tables_in_crm", &["contacts"]));
        endpoint.respond(
            "TABLE_NAME = 'orders'",
            columns(&[("id", "int(11)"), ("total", "decimal(10,2)")]),
        );
        endpoint
    }

    /// Register a response for statements containing `sql_contains`,
    /// replacing any earlier response for the same pattern
    pub fn respond(&self, sql_contains: &str, result: ResultSet) {
        let mut responses = self.responses.lock();
        match responses.iter_mut().find(|(pattern, _)| pattern == sql_contains) {
            Some(entry) => entry.1 = result,
            None => responses.push((sql_contains.to_string(), result)),
        }
    }

    /// Make statements containing `sql_contains` fail
    pub fn fail_matching(&self, sql_contains: &str) {
        self.failing_patterns.lock().push(sql_contains.to_string());
    }

    pub fn stop_failing(&self) {
        self.failing_patterns.lock().clear();
    }

    /// Hold the next statement containing `sql_contains` until the returned
    /// sender fires (or is dropped)
    pub fn gate(&self, sql_contains: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push((sql_contains.to_string(), rx));
        tx
    }

    pub fn fail_open_for(&self, target: &str) {
        self.failing_targets.lock().insert(target.to_string());
    }

    pub fn fail_close(&self) {
        *self.fail_close.lock() = true;
    }

    pub fn advertise(&self, targets: Vec<TargetRef>) {
        *self.targets.lock() = targets;
    }

    pub fn query_count(&self) -> usize {
        self.query_log.lock().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.query_log.lock().iter().map(|(_, sql)| sql.clone()).collect()
    }

    pub fn connection_ids_used(&self) -> Vec<String> {
        self.query_log.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().clone()
    }
}

#[async_trait]
impl SqlEndpoint for MockEndpoint {
    async fn open_connection(&self, target: &str, _credentials: &Credentials) -> Result<String> {
        if self.failing_targets.lock().contains(target) {
            return Err(QdeskError::Status {
                status: 403,
                body: "Access denied".into(),
            });
        }
        let mut next = self.next_id.lock();
        *next += 1;
        let id = format!("conn-{}", *next);
        self.opened.lock().push(target.to_string());
        Ok(id)
    }

    async fn close_connection(&self, connection_id: &str) -> Result<()> {
        self.closed.lock().push(connection_id.to_string());
        if *self.fail_close.lock() {
            return Err(QdeskError::Transport("connection reset by peer".into()));
        }
        Ok(())
    }

    async fn execute(&self, connection_id: &str, sql: &str) -> Result<QueryResults> {
        self.query_log
            .lock()
            .push((connection_id.to_string(), sql.to_string()));

        let gate = {
            let mut gates = self.gates.lock();
            gates
                .iter()
                .position(|(pattern, _)| sql.contains(pattern.as_str()))
                .map(|index| gates.remove(index).1)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self
            .failing_patterns
            .lock()
            .iter()
            .any(|pattern| sql.contains(pattern.as_str()))
        {
            return Err(QdeskError::Query(format!("statement failed: {}", sql)));
        }

        let responses = self.responses.lock();
        match responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            Some((_, result)) => Ok(QueryResults::new(vec![result.clone()])),
            None => Ok(QueryResults::new(vec![ResultSet::empty()])),
        }
    }

    async fn list_targets(&self, resource_type: &str) -> Result<Vec<TargetRef>> {
        if resource_type == "broken" {
            return Err(QdeskError::Status {
                status: 404,
                body: "no such resource".into(),
            });
        }
        Ok(self
            .targets
            .lock()
            .iter()
            .filter(|t| t.kind == resource_type)
            .cloned()
            .collect())
    }
}

/// Notifier that keeps everything it is given
#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn texts(&self) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .map(|n| n.text.clone())
            .collect()
    }

    pub fn count(&self, level: NotificationLevel) -> usize {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.level == level)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

/// Everything a test needs to poke at a session from the outside
pub struct Harness {
    pub endpoint: Arc<MockEndpoint>,
    pub store: Arc<MemorySessionStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub session: Arc<WorkbenchSession>,
}

impl Harness {
    pub fn new(endpoint: MockEndpoint) -> Self {
        Self::with_settings(endpoint, test_settings())
    }

    pub fn with_settings(endpoint: MockEndpoint, settings: SessionSettings) -> Self {
        Self::on_store(Arc::new(endpoint), Arc::new(MemorySessionStore::new()), settings)
    }

    pub fn on_store(
        endpoint: Arc<MockEndpoint>,
        store: Arc<MemorySessionStore>,
        settings: SessionSettings,
    ) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let session = Arc::new(WorkbenchSession::new(
            endpoint.clone(),
            store.clone() as Arc<dyn SessionStore>,
            notifier.clone(),
            &settings,
        ));
        Self {
            endpoint,
            store,
            notifier,
            session,
        }
    }

    /// A second session built on the same endpoint and store, as after a reload
    pub fn reloaded(&self) -> Self {
        Self::on_store(self.endpoint.clone(), self.store.clone(), test_settings())
    }
}

/// Default settings without fetch padding
pub fn test_settings() -> SessionSettings {
    let mut settings = SessionSettings::default();
    settings.tree.min_fetch_duration_ms = 0;
    settings
}

pub fn creds() -> Credentials {
    Credentials::new("admin", "mariadb")
}

pub fn names(column: &str, values: &[&str]) -> ResultSet {
    ResultSet::new(
        vec![column.to_string()],
        values.iter().map(|v| vec![json!(v)]).collect(),
    )
}

pub fn columns(values: &[(&str, &str)]) -> ResultSet {
    ResultSet::new(
        vec!["COLUMN_NAME".into(), "COLUMN_TYPE".into()],
        values.iter().map(|(n, t)| vec![json!(n), json!(t)]).collect(),
    )
}

pub fn single_value(value: i64) -> ResultSet {
    ResultSet::new(vec!["v".into()], vec![vec![json!(value)]])
}

/// First cell of a result set as an integer
pub fn first_value(result: &ResultSet) -> Option<i64> {
    result.rows.first()?.first()?.as_i64()
}

pub fn labels(session: &WorkbenchSession) -> Vec<String> {
    session
        .completion_entries()
        .into_iter()
        .map(|e| e.label)
        .collect()
}

/// Yield until `condition` holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
