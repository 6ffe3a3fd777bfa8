//! Errors surfaced by the session

use qdesk_core::QdeskError;
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// How a failure affects the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The connection is unusable and has been torn down (or never came up)
    ConnectionFatal,
    /// One operation failed; everything else is intact and it may be retried
    OperationLocal,
    /// Remote teardown failed after local state was already cleared
    CleanupFailure,
}

/// Session-level errors with user-facing messages
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] QdeskError),

    #[error("Connection lost: {0}")]
    ConnectionLost(#[source] QdeskError),

    #[error("No active connection")]
    NotConnected,

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Schema loading failed: {0}")]
    SchemaLoadFailed(#[source] QdeskError),

    #[error("Query failed: {0}")]
    QueryFailed(#[source] QdeskError),

    #[error("Listing targets failed: {0}")]
    TargetListFailed(#[source] QdeskError),

    #[error("Disconnection failed: {0}")]
    CleanupFailed(#[source] QdeskError),

    #[error("Endpoint setup failed: {0}")]
    Setup(#[source] QdeskError),
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SessionError::ConnectionFailed(_) | SessionError::ConnectionLost(_) => {
                ErrorClass::ConnectionFatal
            }
            SessionError::CleanupFailed(_) => ErrorClass::CleanupFailure,
            SessionError::NotConnected
            | SessionError::InvalidNode(_)
            | SessionError::SchemaLoadFailed(_)
            | SessionError::QueryFailed(_)
            | SessionError::TargetListFailed(_)
            | SessionError::Setup(_) => ErrorClass::OperationLocal,
        }
    }

    /// Wrap a failure of an operation that did not touch the connection
    ///
    /// Precondition failures keep their own variants so callers can tell "you
    /// asked for something impossible" from "the endpoint said no".
    pub(crate) fn local(error: QdeskError, wrap: fn(QdeskError) -> SessionError) -> Self {
        match error {
            QdeskError::NotConnected => SessionError::NotConnected,
            QdeskError::InvalidNode(message) => SessionError::InvalidNode(message),
            other => wrap(other),
        }
    }
}
