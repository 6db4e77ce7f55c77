use std::time::Duration;

use thiserror::Error;

/// Failures from the OAuth2 token endpoint (and 401/403 on the event stream).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("bad client credentials (401): {body}")]
    BadCredentials { body: String },

    #[error("insufficient scope (403), the client needs '{scope}': {body}")]
    InsufficientScope { scope: String, body: String },

    #[error("token request rejected (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("token response is missing 'access_token'")]
    MalformedResponse,
}

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid tool arguments: {0}")]
    Args(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Timed out after {}s waiting for the 'endpoint' event", .waited.as_secs_f32())]
    HandshakeTimeout { waited: Duration },

    #[error("Timed out after {}s waiting for the response to {method} (id: {id})", .waited.as_secs_f32())]
    RpcTimeout {
        method: String,
        id: String,
        waited: Duration,
    },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Event stream closed: {0}")]
    StreamClosed(String),

    #[error("HTTP error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// Short category label shown in front of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::Config(_) => "config",
            McpError::Args(_) => "arguments",
            McpError::Auth(_) => "auth",
            McpError::HandshakeTimeout { .. } => "handshake timeout",
            McpError::RpcTimeout { .. } => "rpc timeout",
            McpError::Rpc { .. } => "rpc",
            McpError::StreamClosed(_) => "stream",
            McpError::Http { .. } | McpError::Network(_) | McpError::InvalidUrl(_) => "transport",
            McpError::Json(_) => "json",
            McpError::Io(_) => "io",
        }
    }

    /// Process exit status for this failure category.
    pub fn exit_code(&self) -> i32 {
        match self {
            McpError::Config(_) => 2,
            McpError::Args(_) => 3,
            McpError::Auth(_) => 4,
            McpError::HandshakeTimeout { .. } => 5,
            McpError::RpcTimeout { .. } => 6,
            McpError::Rpc { .. } => 7,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, McpError>;
