//! Session configuration.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use switchboard_protocol::McpServerSpec;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default);
    Duration::from_secs(secs)
}

/// How the session learns its id after the transport opens.
///
/// The two deployed peer generations disagree here, so the choice is an
/// explicit setting rather than a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeMode {
    /// The session id is the token supplied to `connect`; the event loop
    /// starts immediately.
    Token,
    /// The peer pushes a `session_created` notification as the first inbound
    /// frame; `connect` blocks until it arrives.
    AwaitSessionCreated,
}

/// Configuration for one [`crate::Session`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket endpoint of the remote execution service.
    pub url: String,
    pub handshake: HandshakeMode,
    /// Default deadline for outbound calls.
    pub call_timeout: Duration,
    /// Deadline for opening the transport and completing the handshake.
    pub connect_timeout: Duration,
    /// Capacity of the write mailbox in front of the transport.
    pub channel_capacity: usize,
    /// MCP servers announced to the peer right after connect.
    pub mcp_servers: Vec<McpServerSpec>,
}

impl SessionConfig {
    /// Build config from environment variables (call [`load_dotenv`] first).
    pub fn from_env() -> Self {
        let handshake = match env_or("SWITCHBOARD_HANDSHAKE", "token").as_str() {
            "session_created" => HandshakeMode::AwaitSessionCreated,
            _ => HandshakeMode::Token,
        };
        Self {
            url: env_or("SWITCHBOARD_URL", "ws://localhost:8080/local-tools"),
            handshake,
            call_timeout: env_secs("SWITCHBOARD_CALL_TIMEOUT_SECS", 30),
            connect_timeout: env_secs("SWITCHBOARD_CONNECT_TIMEOUT_SECS", 10),
            channel_capacity: 64,
            mcp_servers: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_handshake(mut self, handshake: HandshakeMode) -> Self {
        self.handshake = handshake;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add an MCP server to announce on connect.
    pub fn with_mcp_server(mut self, server: McpServerSpec) -> Self {
        self.mcp_servers.push(server);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/local-tools".to_string(),
            handshake: HandshakeMode::Token,
            call_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 64,
            mcp_servers: Vec::new(),
        }
    }
}
