//! reqwest-backed `SqlEndpoint`

use async_trait::async_trait;
use qdesk_core::{Credentials, QdeskError, QueryResults, Result, SqlEndpoint, TargetRef};
use reqwest::{Client, Response, StatusCode, Url};
use std::time::Duration;

use crate::wire::{self, OpenBody, QueryBody};

/// HTTP client for the SQL endpoint
///
/// Holds one pooled `reqwest::Client`; clone-free sharing happens through
/// `Arc<dyn SqlEndpoint>` at the session layer.
pub struct HttpEndpoint {
    client: Client,
    base_url: Url,
}

impl HttpEndpoint {
    /// Create a client for `base_url` without a request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// Create a client for `base_url` with an optional per-request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| QdeskError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into();
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            QdeskError::Connection(format!("invalid endpoint URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(QdeskError::Connection(format!(
                "endpoint URL '{}' cannot take a path",
                base_url
            )));
        }
        tracing::debug!(base_url = %base_url, ?timeout, "created HTTP endpoint");
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL extended by `segments`, each percent-encoded as one segment
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QdeskError::Connection("endpoint URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Read the body of a response, turning non-2xx into `Status` errors
    async fn read_body(response: Response, expected: Option<StatusCode>) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QdeskError::Transport(e.to_string()))?;

        let accepted = match expected {
            Some(code) => status == code,
            None => status.is_success(),
        };
        if !accepted {
            return Err(QdeskError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn transport(e: reqwest::Error) -> QdeskError {
    QdeskError::Transport(e.to_string())
}

#[async_trait]
impl SqlEndpoint for HttpEndpoint {
    #[tracing::instrument(skip(self, credentials), fields(user = %credentials.user))]
    async fn open_connection(&self, target: &str, credentials: &Credentials) -> Result<String> {
        tracing::debug!("requesting new connection");
        let response = self
            .client
            .post(self.url(&["connections"])?)
            .json(&OpenBody {
                target,
                credentials,
            })
            .send()
            .await
            .map_err(transport)?;

        // Only 201 Created counts as an opened connection
        let body = Self::read_body(response, Some(StatusCode::CREATED)).await?;
        let id = wire::parse_created(&body)?;
        tracing::debug!(connection_id = %id, "connection created");
        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    async fn close_connection(&self, connection_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&["connections", connection_id])?)
            .send()
            .await
            .map_err(transport)?;
        Self::read_body(response, None).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(50).collect::<String>()))]
    async fn execute(&self, connection_id: &str, sql: &str) -> Result<QueryResults> {
        let response = self
            .client
            .post(self.url(&["connections", connection_id, "queries"])?)
            .json(&QueryBody { sql })
            .send()
            .await
            .map_err(transport)?;

        let body = Self::read_body(response, None).await?;
        let results = wire::parse_query_results(&body)?;
        tracing::debug!(result_sets = results.results.len(), "query executed");
        Ok(results)
    }

    #[tracing::instrument(skip(self))]
    async fn list_targets(&self, resource_type: &str) -> Result<Vec<TargetRef>> {
        let response = self
            .client
            .get(self.url(&[resource_type])?)
            .query(&[(format!("fields[{}]", resource_type), "id")])
            .send()
            .await
            .map_err(transport)?;

        let body = Self::read_body(response, None).await?;
        wire::parse_targets(&body)
    }
}
