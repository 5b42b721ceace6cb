//! The session: one duplex connection plus its correlation state.
//!
//! A [`Session`] owns exactly one background event loop, which owns the
//! transport outright. The loop is the only reader and the only physical
//! writer; outbound frames from other tasks (callers of [`Session::call`],
//! inbound-call replies from the router) arrive through an mpsc write
//! mailbox. `tokio::select!` multiplexes mailbox, transport and shutdown on
//! the one task, which keeps the pending-call table consistent without a
//! transport-level lock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use switchboard_protocol::{Frame, Request, SessionCreatedParams};
use switchboard_tools::ToolRegistry;

use crate::config::{HandshakeMode, SessionConfig};
use crate::error::SessionError;
use crate::pending::PendingCalls;
use crate::router;
use crate::transport::{Transport, WsTransport};

/// One frame queued for the event loop to write to the transport.
pub(crate) struct WriteCommand {
    pub(crate) text: String,
}

/// Lifecycle of a session.
///
/// `Closed` is terminal: once a connected session ends, a new [`Session`]
/// must be constructed to talk to the service again. A failed `connect`
/// returns to `Disconnected` and may be retried.
enum Lifecycle {
    Disconnected,
    Connecting,
    Connected(Connected),
    Closed,
}

/// Live-connection state, replaced wholesale on disconnect.
struct Connected {
    session_id: String,
    write_tx: mpsc::Sender<WriteCommand>,
    shutdown: Arc<Notify>,
    loop_handle: JoinHandle<()>,
}

/// A bidirectional RPC session with the remote execution service.
///
/// Outbound calls go through [`Session::call`] (or the typed operations
/// layered on it); inbound `execute_tool` calls from the peer are resolved
/// against the session's [`ToolRegistry`] and answered on the same socket.
pub struct Session {
    config: SessionConfig,
    registry: Arc<ToolRegistry>,
    pending: Arc<PendingCalls>,
    state: Arc<Mutex<Lifecycle>>,
}

impl Session {
    /// Create a disconnected session with an empty tool registry.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_registry(config, Arc::new(ToolRegistry::new()))
    }

    /// Create a disconnected session around an existing registry.
    pub fn with_registry(config: SessionConfig, registry: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            registry,
            pending: Arc::new(PendingCalls::new()),
            state: Arc::new(Mutex::new(Lifecycle::Disconnected)),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session's local tool registry.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The session id, once connected.
    ///
    /// In [`HandshakeMode::Token`] this is the token passed to `connect`; in
    /// [`HandshakeMode::AwaitSessionCreated`] it is the id the peer pushed.
    pub async fn session_id(&self) -> Option<String> {
        match &*self.state.lock().await {
            Lifecycle::Connected(c) => Some(c.session_id.clone()),
            _ => None,
        }
    }

    pub async fn is_connected(&self) -> bool {
        matches!(&*self.state.lock().await, Lifecycle::Connected(_))
    }

    /// Open the configured WebSocket endpoint and start the session.
    ///
    /// The token is attached as the connection's correlation header. On
    /// failure the session remains `Disconnected` and `connect` may be
    /// retried.
    pub async fn connect(&self, token: &str) -> Result<(), SessionError> {
        self.begin_connect().await?;

        let opening = WsTransport::open(&self.config.url, token);
        let transport = match tokio::time::timeout(self.config.connect_timeout, opening).await {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => {
                self.abort_connect().await;
                return Err(SessionError::Connect(e.to_string()));
            }
            Err(_) => {
                self.abort_connect().await;
                return Err(SessionError::Connect(format!(
                    "timed out opening {} after {:?}",
                    self.config.url, self.config.connect_timeout
                )));
            }
        };

        self.finish_connect(Box::new(transport), token).await
    }

    /// Start the session over an already-open transport.
    ///
    /// Used with [`crate::transport::ChannelTransport`] in tests and by
    /// embedders supplying their own transport.
    pub async fn connect_with(
        &self,
        transport: Box<dyn Transport>,
        token: &str,
    ) -> Result<(), SessionError> {
        self.begin_connect().await?;
        self.finish_connect(transport, token).await
    }

    async fn begin_connect(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        match &*state {
            Lifecycle::Disconnected => {
                *state = Lifecycle::Connecting;
                Ok(())
            }
            Lifecycle::Connecting => {
                Err(SessionError::Connect("connect already in progress".into()))
            }
            Lifecycle::Connected(_) => {
                Err(SessionError::Connect("session already connected".into()))
            }
            Lifecycle::Closed => Err(SessionError::ConnectionClosed),
        }
    }

    /// Roll `Connecting` back to `Disconnected` after a failed attempt.
    async fn abort_connect(&self) {
        let mut state = self.state.lock().await;
        if matches!(&*state, Lifecycle::Connecting) {
            *state = Lifecycle::Disconnected;
        }
    }

    async fn finish_connect(
        &self,
        mut transport: Box<dyn Transport>,
        token: &str,
    ) -> Result<(), SessionError> {
        let session_id = match self.config.handshake {
            HandshakeMode::Token => token.to_string(),
            HandshakeMode::AwaitSessionCreated => {
                match self.await_session_created(transport.as_mut()).await {
                    Ok(id) => id,
                    Err(e) => {
                        self.abort_connect().await;
                        return Err(e);
                    }
                }
            }
        };

        let (write_tx, write_rx) = mpsc::channel(self.config.channel_capacity);
        let shutdown = Arc::new(Notify::new());
        let loop_handle = tokio::spawn(event_loop(
            transport,
            write_rx,
            write_tx.clone(),
            Arc::clone(&self.pending),
            Arc::clone(&self.registry),
            Arc::clone(&self.state),
            Arc::clone(&shutdown),
        ));

        {
            let mut state = self.state.lock().await;
            match &*state {
                Lifecycle::Connecting => {
                    *state = Lifecycle::Connected(Connected {
                        session_id: session_id.clone(),
                        write_tx,
                        shutdown: Arc::clone(&shutdown),
                        loop_handle,
                    });
                }
                // disconnect() won the race while we were handshaking.
                _ => {
                    drop(state);
                    shutdown.notify_one();
                    return Err(SessionError::ConnectionClosed);
                }
            }
        }
        info!(session_id = %session_id, "session connected");

        // Announce what the peer should know about before any code runs. A
        // half-announced session is torn down rather than left connected.
        if let Err(e) = self.announce().await {
            warn!(error = %e, "announcement failed, tearing session down");
            self.disconnect().await;
            return Err(e);
        }
        Ok(())
    }

    /// Read frames inline (loop not yet running) until the peer pushes
    /// `session_created`, bounded by the connect timeout.
    async fn await_session_created(
        &self,
        transport: &mut dyn Transport,
    ) -> Result<String, SessionError> {
        let deadline = self.config.connect_timeout;
        let raw = tokio::time::timeout(deadline, transport.recv())
            .await
            .map_err(|_| {
                SessionError::Handshake(format!("no session_created within {:?}", deadline))
            })?
            .map_err(|e| SessionError::Handshake(e.to_string()))?
            .ok_or_else(|| {
                SessionError::Handshake("transport closed before session_created".into())
            })?;

        match Frame::parse(&raw) {
            Ok(Frame::Notification(n)) if n.method == "session_created" => {
                let params: SessionCreatedParams =
                    serde_json::from_value(n.params.unwrap_or_default()).map_err(|e| {
                        SessionError::Handshake(format!("bad session_created params: {}", e))
                    })?;
                Ok(params.session_id)
            }
            Ok(_) => Err(SessionError::Handshake(
                "first frame was not session_created".into(),
            )),
            Err(e) => Err(SessionError::Handshake(format!(
                "undecodable first frame: {}",
                e
            ))),
        }
    }

    /// Announce pre-registered tools, then configured MCP servers, in order.
    async fn announce(&self) -> Result<(), SessionError> {
        for spec in self.registry.specs() {
            debug!(tool = %spec.qualified_name(), "announcing tool");
            self.call(
                "register_tool",
                serde_json::to_value(&spec)?,
                self.config.call_timeout,
            )
            .await?;
        }
        for server in self.config.mcp_servers.clone() {
            debug!(server = %server.name, "announcing MCP server");
            self.register_mcp(server).await?;
        }
        Ok(())
    }

    /// Issue an outbound call and wait for the correlated reply.
    ///
    /// The pending entry is registered before the frame is written, so the
    /// reply can never race past an unknown id. On timeout the entry is
    /// removed here, not by the loop; a reply arriving later finds nothing
    /// to settle and is discarded.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, SessionError> {
        let write_tx = {
            let state = self.state.lock().await;
            match &*state {
                Lifecycle::Connected(c) => c.write_tx.clone(),
                Lifecycle::Closed => return Err(SessionError::ConnectionClosed),
                _ => return Err(SessionError::NotConnected),
            }
        };

        let (id, rx) = self.pending.register().await;
        let request = Request::new(id.clone(), method, Some(params));
        let text = serde_json::to_string(&request)?;

        if write_tx.send(WriteCommand { text }).await.is_err() {
            self.pending.remove(&id).await;
            return Err(SessionError::ConnectionClosed);
        }
        debug!(id = %id, method, "sent request");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                // Slot dropped without settlement: the loop died mid-call.
                self.pending.remove(&id).await;
                Err(SessionError::ConnectionClosed)
            }
            Err(_) => {
                self.pending.remove(&id).await;
                Err(SessionError::Timeout(timeout))
            }
        }
    }

    /// Stop the session: cancel the event loop, fail every outstanding call
    /// with `ConnectionClosed`, close the transport.
    ///
    /// Idempotent. Safe to call when never connected (the session stays
    /// retryable); after a connected session disconnects, the state is
    /// terminal.
    pub async fn disconnect(&self) {
        let conn = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, Lifecycle::Closed) {
                Lifecycle::Connected(c) => Some(c),
                Lifecycle::Disconnected => {
                    *state = Lifecycle::Disconnected;
                    None
                }
                Lifecycle::Connecting | Lifecycle::Closed => None,
            }
        };

        if let Some(conn) = conn {
            info!(session_id = %conn.session_id, "disconnecting session");
            conn.shutdown.notify_one();
            // The loop settles all pending calls on its way out.
            let _ = conn.loop_handle.await;
        }
    }
}

/// Single consumer of the transport; owns it for the session's life.
async fn event_loop(
    mut transport: Box<dyn Transport>,
    mut write_rx: mpsc::Receiver<WriteCommand>,
    write_tx: mpsc::Sender<WriteCommand>,
    pending: Arc<PendingCalls>,
    registry: Arc<ToolRegistry>,
    state: Arc<Mutex<Lifecycle>>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("event loop received shutdown");
                break;
            }
            Some(cmd) = write_rx.recv() => {
                if let Err(e) = transport.send(&cmd.text).await {
                    warn!(error = %e, "transport write failed, ending session");
                    break;
                }
            }
            result = transport.recv() => {
                match result {
                    Ok(Some(raw)) => handle_frame(raw, &pending, &registry, &write_tx).await,
                    Ok(None) => {
                        info!("transport closed by peer");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "transport read failed, ending session");
                        break;
                    }
                }
            }
        }
    }

    pending.fail_all().await;
    *state.lock().await = Lifecycle::Closed;
}

/// Classify one inbound frame: reply to one of ours, peer-initiated call,
/// or noise. Never fatal — a bad frame is logged and the loop reads on.
async fn handle_frame(
    raw: String,
    pending: &PendingCalls,
    registry: &Arc<ToolRegistry>,
    write_tx: &mpsc::Sender<WriteCommand>,
) {
    let frame = match Frame::parse(&raw) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "skipping undecodable frame");
            return;
        }
    };

    match frame {
        Frame::Response(resp) => {
            let id = resp.id.clone();
            if pending.settle(&id, Ok(resp.result)).await {
                debug!(id = %id, "call settled");
            } else {
                warn!(id = %id, "reply for unknown call id, discarding");
            }
        }
        Frame::Error(err) => {
            let id = err.id.clone();
            let outcome = Err(SessionError::Remote {
                code: err.error.code,
                message: err.error.message,
                data: err.error.data,
            });
            if pending.settle(&id, outcome).await {
                debug!(id = %id, "call settled with remote error");
            } else {
                warn!(id = %id, "error reply for unknown call id, discarding");
            }
        }
        Frame::Request(req) => {
            // A slow tool must not stall delivery of unrelated frames, so
            // each inbound call runs as its own task.
            debug!(id = %req.id, method = %req.method, "inbound call");
            tokio::spawn(router::handle_inbound_call(
                req,
                Arc::clone(registry),
                write_tx.clone(),
            ));
        }
        Frame::Notification(n) => {
            debug!(method = %n.method, "ignoring notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use switchboard_protocol::RpcId;

    fn quick_config() -> SessionConfig {
        SessionConfig::default().with_call_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_call_before_connect() {
        let session = Session::new(quick_config());
        let err = session
            .call("list_functions", serde_json::json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }

    #[tokio::test]
    async fn test_timeout_removes_pending_entry() {
        let session = Session::new(quick_config());
        let (local, _peer) = ChannelTransport::pair();
        session.connect_with(Box::new(local), "tok").await.unwrap();

        let err = session
            .call("ping", serde_json::json!({}), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
        assert!(!session.pending.contains(&RpcId::Number(1)).await);
    }

    #[tokio::test]
    async fn test_disconnect_never_connected_is_retryable() {
        let session = Session::new(quick_config());
        session.disconnect().await;
        session.disconnect().await;

        let (local, _peer) = ChannelTransport::pair();
        session.connect_with(Box::new(local), "tok").await.unwrap();
        assert!(session.is_connected().await);
    }

    #[tokio::test]
    async fn test_disconnect_is_terminal() {
        let session = Session::new(quick_config());
        let (local, _peer) = ChannelTransport::pair();
        session.connect_with(Box::new(local), "tok").await.unwrap();

        session.disconnect().await;
        assert!(!session.is_connected().await);

        let (local, _peer) = ChannelTransport::pair();
        let err = session
            .connect_with(Box::new(local), "tok")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_token_mode_session_id() {
        let session = Session::new(quick_config());
        let (local, _peer) = ChannelTransport::pair();
        session
            .connect_with(Box::new(local), "sess-42")
            .await
            .unwrap();
        assert_eq!(session.session_id().await.as_deref(), Some("sess-42"));
    }

    #[tokio::test]
    async fn test_peer_close_ends_session() {
        let session = Session::new(quick_config());
        let (local, peer) = ChannelTransport::pair();
        session.connect_with(Box::new(local), "tok").await.unwrap();

        drop(peer);
        // Give the loop a moment to observe the close.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = session
            .call("ping", serde_json::json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ConnectionClosed));
    }
}
