//! # arena-bot
//!
//! Automated Connect Four player for an AI arena's live WebSocket API.
//!
//! The bot connects to `ws://<host>/api/live`, identifies with a secret
//! token, polls for open lobbies, joins the first one it sees and answers
//! every game update on its turn by dropping a piece into the first column
//! that still has room.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] for any text-frame channel
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   [`WebSocketTransport`]
//! - **Event-driven**: observe the session through typed [`ArenaEvent`]s
//! - **CLI**: the default `cli` feature builds the `arena-bot` binary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), arena_bot::ArenaError> {
//! use arena_bot::{live_url, ArenaClient, ArenaConfig, ArenaEvent, WebSocketTransport};
//!
//! let transport = WebSocketTransport::connect(&live_url("localhost")).await?;
//! let (mut client, mut events) = ArenaClient::start(transport, ArenaConfig::new("token"))?;
//!
//! while let Some(event) = events.recv().await {
//!     if let ArenaEvent::Disconnected { .. } = event {
//!         break;
//!     }
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod protocol;
pub mod strategy;
pub mod transport;

#[cfg(feature = "tokio-runtime")]
pub mod client;

pub mod transports;

// Re-export primary types for ergonomic imports.
#[cfg(feature = "tokio-runtime")]
pub use client::{ArenaClient, ArenaConfig};
pub use error::ArenaError;
pub use event::ArenaEvent;
pub use protocol::{ClientMessage, ServerMessage};
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::{live_url, WebSocketTransport};
