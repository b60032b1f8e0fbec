//! WebSocket transport built on `tokio-tungstenite`.
//!
//! The arena serves its live API at `ws://<host>/api/live`; [`live_url`]
//! builds that address from the host given on the command line.
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), arena_bot::ArenaError> {
//! use arena_bot::transports::websocket::live_url;
//! use arena_bot::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect(&live_url("localhost")).await?;
//! transport.send("PING".to_string()).await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::ArenaError;
use crate::transport::Transport;

/// Path of the live API endpoint.
pub const LIVE_PATH: &str = "/api/live";

/// Underlying WebSocket stream type.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Build the live API URL for `host` (which may carry a `:port`).
pub fn live_url(host: &str) -> String {
    format!("ws://{host}{LIVE_PATH}")
}

/// A [`Transport`] backed by a WebSocket connection.
///
/// [`recv`](Transport::recv) is cancel-safe: `StreamExt::next` on the
/// underlying stream does not consume a frame unless it completes.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Dial `url` and complete the WebSocket handshake.
    ///
    /// No timeout is applied to the dial.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Io`] if the URL is invalid or the connection
    /// cannot be established. I/O error kinds are preserved; every other
    /// handshake failure maps to [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, ArenaError> {
        tracing::debug!(url = %url, "connecting to arena");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            ArenaError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "connected to arena");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established stream (custom TLS, proxies, headers).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), ArenaError> {
        if self.closed {
            return Err(ArenaError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| ArenaError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ArenaError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return Some(Err(ArenaError::TransportReceive(e.to_string()))),
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received close frame");
                    return None;
                }
                // tungstenite queues the pong itself.
                Message::Ping(_) => tracing::trace!("received ping"),
                Message::Pong(_) => tracing::trace!("received pong"),
                Message::Binary(_) => tracing::warn!("skipping unexpected binary frame"),
                Message::Frame(_) => tracing::debug!("skipping raw frame"),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ArenaError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| ArenaError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    #[test]
    fn live_url_appends_api_path() {
        assert_eq!(live_url("localhost"), "ws://localhost/api/live");
        assert_eq!(live_url("10.0.0.2:8080"), "ws://10.0.0.2:8080/api/live");
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, ArenaError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1/api/live")
            .await
            .unwrap_err();
        assert!(matches!(err, ArenaError::Io(_)));
    }

    /// Start a local WebSocket server that runs `handler` on the first
    /// accepted connection and return the URL to dial.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        live_url(&addr.to_string())
    }

    #[tokio::test]
    async fn recv_yields_text_frames_in_order() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"identified"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text("second".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"identified"}"#
        );
        assert_eq!(transport.recv().await.unwrap().unwrap(), "second");
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "after_binary");
    }

    #[tokio::test]
    async fn keepalive_goes_out_as_plain_text() {
        let (seen_tx, seen_rx) = oneshot::channel();
        let url = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = seen_tx.send(text.to_string());
            }
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.send("PING".to_string()).await.unwrap();
        assert_eq!(seen_rx.await.unwrap(), "PING");
    }

    #[tokio::test]
    async fn close_sends_close_frame_and_server_ack_ends_recv() {
        let (seen_tx, seen_rx) = oneshot::channel();
        let url = start_mock_server(|mut ws| async move {
            let mut got_close = false;
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    got_close = true;
                }
            }
            let _ = seen_tx.send(got_close);
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        assert!(transport.recv().await.is_none());
        assert!(seen_rx.await.unwrap());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("PING".to_string()).await.unwrap_err();
        assert!(matches!(err, ArenaError::TransportClosed));
    }

    #[tokio::test]
    async fn double_close_is_idempotent() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn dial_fails_when_handshake_is_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept the TCP connection, then hang up before any handshake.
            let (tcp, _) = listener.accept().await.unwrap();
            drop(tcp);
        });

        let err = WebSocketTransport::connect(&live_url(&addr.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ArenaError::Io(_)), "got {err:?}");
    }
}
