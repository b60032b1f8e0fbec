//! Error types for the arena client.

use thiserror::Error;

/// Errors that can occur while talking to the arena server.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was already closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// A frame could not be encoded or did not match the expected message shape.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred (dial failures end up here).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The supplied [`ArenaConfig`](crate::client::ArenaConfig) cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A specialized [`Result`] type for arena client operations.
pub type Result<T> = std::result::Result<T, ArenaError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn messages_prefix_the_failing_layer() {
        let cases = [
            (
                ArenaError::TransportSend("broken pipe".into()),
                "transport send error: broken pipe",
            ),
            (
                ArenaError::TransportReceive("reset".into()),
                "transport receive error: reset",
            ),
            (ArenaError::TransportClosed, "transport connection closed"),
            (
                ArenaError::InvalidConfig("token is empty".into()),
                "invalid configuration: token is empty",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn io_and_json_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(ArenaError::from(io), ArenaError::Io(_)));

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(ArenaError::from(json)
            .to_string()
            .starts_with("serialization error"));
    }
}
