//! Bidirectional RPC session engine for the remote code-execution service.
//!
//! One persistent duplex connection, both sides initiating calls: the local
//! process lists functions, fetches signatures, submits code and registers
//! tools; the peer, mid-execution, calls back into locally registered tools
//! and waits for their results.
//!
//! # Architecture
//!
//! - **transport**: the `Transport` trait plus WebSocket and in-memory
//!   channel implementations
//! - **pending**: the table of outstanding outbound calls, keyed by
//!   correlation id
//! - **session**: lifecycle, the event loop owning the transport, and the
//!   raw `call` surface
//! - **router**: answers the peer's `execute_tool` calls against the local
//!   registry
//! - **ops**: the typed operations (`list_functions`, `execute`, …)
//! - **config**: `SessionConfig`, handshake modes, env loading
//! - **error**: `SessionError` and `TransportError`
//!
//! # Usage
//! ```no_run
//! use switchboard_session::{Session, SessionConfig};
//! use switchboard_tools::add_tool;
//!
//! # async fn example() -> Result<(), switchboard_session::SessionError> {
//! let session = Session::new(SessionConfig::from_env());
//! session.register_tool(add_tool()).await?;
//! session.connect("previously-issued-session-id").await?;
//!
//! let run = session.execute("const x = await math.add({a: 2, b: 3});").await?;
//! println!("{}", run.stdout);
//!
//! session.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod ops;
mod pending;
mod router;
pub mod session;
pub mod transport;

pub use config::{load_dotenv, HandshakeMode, SessionConfig};
pub use error::{SessionError, TransportError};
pub use session::Session;
pub use transport::{ChannelTransport, Transport, WsTransport, SESSION_HEADER};
