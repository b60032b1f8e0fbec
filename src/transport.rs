//! Transport abstraction for the arena live API.
//!
//! The [`Transport`] trait is a bidirectional text-frame channel. Connection
//! setup is not part of the trait: construct a connected transport (for
//! example with [`WebSocketTransport::connect`](crate::transports::WebSocketTransport::connect))
//! and pass it to [`ArenaClient::start`](crate::client::ArenaClient::start).
//!
//! Tests drive the client through scripted in-memory transports.

use async_trait::async_trait;

use crate::error::ArenaError;

/// A bidirectional text message transport.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is polled inside `tokio::select!` next to the
/// session timers, so it **MUST** be cancel-safe: dropping an unfinished
/// `recv` future must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::TransportSend`] if the frame could not be written,
    /// or [`ArenaError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), ArenaError>;

    /// Receive the next text frame.
    ///
    /// Returns:
    /// - `Some(Ok(text))` for a complete frame
    /// - `Some(Err(e))` when the connection broke
    /// - `None` when the server closed the connection cleanly
    async fn recv(&mut self) -> Option<Result<String, ArenaError>>;

    /// Send the close control frame. Calling it twice is a no-op.
    ///
    /// [`recv`](Transport::recv) keeps working afterwards so the caller can wait
    /// for the server to acknowledge the close.
    ///
    /// # Errors
    ///
    /// Returns an error if the close frame could not be written.
    async fn close(&mut self) -> Result<(), ArenaError>;
}
