#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for arena-bot integration tests.
//!
//! Provides a scripted [`MockTransport`] and builders for the JSON frames the
//! arena pushes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use arena_bot::{ArenaError, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};

pub type Scripted = Option<Result<String, ArenaError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// Replays scripted server frames and records everything the client sends.
pub struct MockTransport {
    incoming: VecDeque<Scripted>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(incoming: Vec<Scripted>) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), ArenaError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ArenaError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // No more scripted frames: stay silent until shutdown.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), ArenaError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Frame builders ──────────────────────────────────────────────────

pub fn frame(value: Value) -> Scripted {
    Some(Ok(value.to_string()))
}

pub fn identified_json() -> Value {
    json!({"type": "identified"})
}

pub fn open_lobbies_json(ids: &[&str]) -> Value {
    let matches: Vec<Value> = ids.iter().map(|id| json!({"match": id})).collect();
    json!({"type": "open-lobbies", "matches": matches})
}

/// A `game-update` where `filled[i]` is the number of occupied cells in column `i`.
pub fn game_update_json(active: Option<i64>, slot: i64, filled: [usize; 7], match_id: &str) -> Value {
    let board: Vec<Value> = filled
        .iter()
        .map(|&n| Value::Array(vec![json!(1); n]))
        .collect();
    let mut update = json!({
        "type": "game-update",
        "slot": slot,
        "state": {"board": board},
        "gi": {"match": match_id, "game": "Connect Four"}
    });
    if let Some(active) = active {
        update["activePlayer"] = json!(active);
    }
    update
}

// ── Inspection ──────────────────────────────────────────────────────

/// Sent frames that parse as JSON, in order.
pub fn sent_json(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<Value> {
    sent.lock()
        .unwrap()
        .iter()
        .filter_map(|s| serde_json::from_str(s).ok())
        .collect()
}

/// Sent frames whose `action` tag equals `action`.
pub fn sent_actions(sent: &Arc<StdMutex<Vec<String>>>, action: &str) -> Vec<Value> {
    sent_json(sent)
        .into_iter()
        .filter(|v| v["action"] == action)
        .collect()
}
