//! Error types for qdesk

use thiserror::Error;

/// Core error type for qdesk operations
#[derive(Error, Debug)]
pub enum QdeskError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("No active connection")]
    NotConnected,

    #[error("Query error: {0}")]
    Query(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for qdesk operations
pub type Result<T> = std::result::Result<T, QdeskError>;
