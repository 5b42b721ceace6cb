//! Session transport layer.
//!
//! Defines the `Transport` trait the event loop reads from and writes to,
//! with a WebSocket implementation for production and an in-memory channel
//! pair for tests and embedding. Each message is one text frame holding one
//! JSON-RPC object.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::TransportError;

/// Request header carrying the session token on the WebSocket upgrade.
pub const SESSION_HEADER: &str = "x-code-mode-session";

/// One duplex message stream.
///
/// Implementations carry whole text messages; framing below that (WebSocket
/// frames, channel entries) is theirs to hide.
#[async_trait]
pub trait Transport: Send {
    /// Read the next message. Returns `None` when the peer closed the
    /// connection in an orderly way.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Write one message.
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;
}

/// WebSocket client transport.
///
/// Connects with the session token attached as the [`SESSION_HEADER`]
/// request header, which is how the remote service correlates the socket
/// with a previously created session.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Open a WebSocket connection to `url` on behalf of `token`.
    pub async fn open(url: &str, token: &str) -> Result<Self, TransportError> {
        let mut request = url.into_client_request()?;
        let value =
            HeaderValue::from_str(token).map_err(|e| TransportError::Header(e.to_string()))?;
        request.headers_mut().insert(SESSION_HEADER, value);

        let (stream, _) = connect_async(request).await?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Close(_))) => return Ok(None),
                // Pings are answered by tungstenite itself; pongs and binary
                // frames are not part of this protocol.
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        self.stream.send(Message::text(message)).await?;
        Ok(())
    }
}

/// In-memory transport for testing, backed by channel pairs.
pub struct ChannelTransport {
    rx: tokio::sync::mpsc::Receiver<String>,
    tx: tokio::sync::mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Create a pair of connected transports.
    ///
    /// Messages sent on one transport are received by the other; dropping
    /// one end reads as an orderly close on the other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = tokio::sync::mpsc::channel(32);
        let (tx_b, rx_a) = tokio::sync::mpsc::channel(32);
        (Self { rx: rx_a, tx: tx_a }, Self { rx: rx_b, tx: tx_b })
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.rx.recv().await)
    }

    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        self.tx
            .send(message.to_string())
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transport_pair() {
        let (mut a, mut b) = ChannelTransport::pair();

        a.send("hello from a").await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Some("hello from a".to_string()));

        b.send("hello from b").await.unwrap();
        assert_eq!(a.recv().await.unwrap(), Some("hello from b".to_string()));
    }

    #[tokio::test]
    async fn test_channel_transport_closed() {
        let (mut a, b) = ChannelTransport::pair();
        drop(b);
        assert_eq!(a.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_channel_transport_send_after_close() {
        let (mut a, b) = ChannelTransport::pair();
        drop(b);
        assert!(matches!(
            a.send("into the void").await,
            Err(TransportError::ChannelClosed)
        ));
    }
}
