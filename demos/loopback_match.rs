//! # Loopback Match
//!
//! Plays a short scripted Connect Four session against an in-process fake
//! arena, using a channel-backed [`Transport`] instead of a WebSocket. Handy
//! for watching the bot's decisions without a server:
//!
//! ```sh
//! RUST_LOG=arena_bot=trace cargo run --example loopback_match
//! ```

use std::time::Duration;

use arena_bot::{ArenaClient, ArenaConfig, ArenaError, ArenaEvent, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Channel-backed transport
// ─────────────────────────────────────────────────────────────────────

/// Client half: handed to `ArenaClient::start`.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Arena half: reads what the bot sent and pushes server frames.
pub struct LoopbackArena {
    pub rx: mpsc::UnboundedReceiver<String>,
    pub tx: mpsc::UnboundedSender<String>,
}

fn loopback_pair() -> (LoopbackTransport, LoopbackArena) {
    let (client_tx, arena_rx) = mpsc::unbounded_channel();
    let (arena_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        },
        LoopbackArena {
            rx: arena_rx,
            tx: arena_tx,
        },
    )
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), ArenaError> {
        self.tx
            .send(message)
            .map_err(|e| ArenaError::TransportSend(e.to_string()))
    }

    /// Cancel-safe: `UnboundedReceiver::recv` is.
    async fn recv(&mut self) -> Option<Result<String, ArenaError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ArenaError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Fake arena
// ─────────────────────────────────────────────────────────────────────

/// Answers identify/search/join, then feeds game updates in which the
/// opponent always stacks column 0, until the bot has played `moves` times.
async fn run_arena(mut arena: LoopbackArena, moves: usize) {
    let mut board: Vec<Vec<Value>> = vec![Vec::new(); 7];
    let mut played = 0;

    while let Some(frame) = arena.rx.recv().await {
        let Ok(action) = serde_json::from_str::<Value>(&frame) else {
            tracing::info!("arena <<< {frame}");
            continue;
        };
        tracing::info!("arena <<< {action}");

        let reply = match action["action"].as_str() {
            Some("identify") => json!({"type": "identified"}),
            Some("match-list") => json!({"type": "open-lobbies", "matches": [{"match": "demo"}]}),
            Some("join") => {
                if let Some(column) = board.first_mut() {
                    column.push(json!(1));
                }
                game_update(&board)
            }
            Some("action") => {
                let col = action["payload"]["col"].as_u64().unwrap_or_default();
                if let Some(column) = usize::try_from(col).ok().and_then(|c| board.get_mut(c)) {
                    column.push(json!(0));
                }
                played += 1;
                if played >= moves {
                    break;
                }
                if let Some(column) = board.first_mut() {
                    if column.len() < 6 {
                        column.push(json!(1));
                    }
                }
                game_update(&board)
            }
            _ => continue,
        };

        if arena.tx.send(reply.to_string()).is_err() {
            break;
        }
    }
    // Dropping the arena half closes the bot's receive side.
}

fn game_update(board: &[Vec<Value>]) -> Value {
    json!({
        "type": "game-update",
        "activePlayer": 0,
        "slot": 0,
        "state": {"board": board},
        "gi": {"match": "demo"}
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (transport, arena) = loopback_pair();
    tokio::spawn(run_arena(arena, 8));

    let config = ArenaConfig::new("demo-token")
        .with_identify_delay(Duration::from_millis(50))
        .with_search_interval(Duration::from_millis(200))
        .with_stop_search_after_join(true);
    let (mut client, mut events) = ArenaClient::start(transport, config)?;

    while let Some(event) = events.recv().await {
        match event {
            ArenaEvent::MovePlayed { col, .. } => tracing::info!("bot played column {col}"),
            ArenaEvent::Disconnected { reason } => {
                tracing::info!("session over: {}", reason.as_deref().unwrap_or("arena left"));
                break;
            }
            other => tracing::info!("event: {other:?}"),
        }
    }

    client.shutdown().await;
    Ok(())
}
