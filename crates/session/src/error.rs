//! Error types for the session crate.

use std::time::Duration;

use serde_json::Value;

use switchboard_tools::RegistryError;

/// Errors surfaced to callers of the session's outbound surface.
///
/// A closed connection ([`SessionError::ConnectionClosed`]) is deliberately
/// distinct from a peer-side application error ([`SessionError::Remote`]) so
/// callers can decide whether building a fresh session is worth a retry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport could not be opened.
    #[error("failed to connect: {0}")]
    Connect(String),

    /// The transport opened but the handshake did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A call was issued before `connect`.
    #[error("session is not connected")]
    NotConnected,

    /// The session ended while the call was in flight, or before it started.
    #[error("connection closed")]
    ConnectionClosed,

    /// No response arrived within the caller's deadline.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The peer answered the call with an error response.
    #[error("remote error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// Local tool registration failed; nothing was sent on the wire.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An MCP server spec carried an unparseable URL.
    #[error("invalid MCP server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A params payload could not be serialized, or a result payload did
    /// not match its typed shape.
    #[error("failed to encode or decode payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level failure beneath the session.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors produced by a [`crate::transport::Transport`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid session token for connection header: {0}")]
    Header(String),

    #[error("channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_variant_covers_both_directions() {
        let err: SessionError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SessionError::Json(_)));
        assert!(err
            .to_string()
            .starts_with("failed to encode or decode payload"));
    }
}
