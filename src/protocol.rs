//! Wire types for the arena live API.
//!
//! Every frame is a flat JSON object. Frames sent by the client carry an
//! `action` tag, frames pushed by the server carry a `type` tag:
//!
//! ```text
//! → {"action":"identify","token":"…"}
//! ← {"type":"identified"}
//! → {"action":"match-list","game":"Connect Four"}
//! ← {"type":"open-lobbies","matches":[{"match":"m1"}]}
//! → {"action":"join","match":"m1"}
//! ← {"type":"game-update","activePlayer":0,"slot":0,"state":{"board":[…]},"gi":{"match":"m1"}}
//! → {"action":"action","match":"m1","payload":{"col":0}}
//! ```
//!
//! The keepalive is the bare text [`KEEPALIVE_FRAME`] and has no JSON form.

use serde::{Deserialize, Serialize};

use crate::strategy::Column;

/// Identifier the server assigns to a match.
pub type MatchId = String;

/// Literal text frame sent to keep the connection from idling out.
pub const KEEPALIVE_FRAME: &str = "PING";

/// Game name requested by default when searching for lobbies.
pub const CONNECT_FOUR: &str = "Connect Four";

// ── Client → server ─────────────────────────────────────────────────

/// Column choice carried by a [`ClientMessage::Action`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovePayload {
    pub col: u8,
}

/// Actions sent from the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Authenticate this connection with a secret token.
    Identify { token: String },
    /// Ask for the open lobbies of one game.
    MatchList { game: String },
    /// Join an advertised match.
    Join {
        #[serde(rename = "match")]
        match_id: MatchId,
    },
    /// Play a move in a joined match.
    Action {
        #[serde(rename = "match")]
        match_id: MatchId,
        payload: MovePayload,
    },
}

// ── Server → client ─────────────────────────────────────────────────

/// One joinable match in an `open-lobbies` listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyEntry {
    #[serde(rename = "match")]
    pub match_id: MatchId,
}

/// Match metadata attached to a game update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameInfo {
    #[serde(rename = "match")]
    pub match_id: MatchId,
}

/// Game state attached to a game update. The board is column-major: each
/// inner sequence holds the occupied cells of one column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GameState {
    pub board: Vec<Column>,
}

/// Payload of a `game-update` push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdatePayload {
    /// Slot whose turn it is. Absent while the match has not started or is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_player: Option<i64>,
    /// This client's seat in the match.
    pub slot: i64,
    pub state: GameState,
    pub gi: GameInfo,
}

impl GameUpdatePayload {
    /// Returns `true` when the server says it is this client's turn.
    pub fn is_our_turn(&self) -> bool {
        self.active_player == Some(self.slot)
    }
}

/// Messages pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// The identify token was accepted.
    Identified,
    /// Response to a `match-list` action.
    OpenLobbies { matches: Vec<LobbyEntry> },
    /// State change in a joined match (boxed to reduce enum size).
    GameUpdate(Box<GameUpdatePayload>),
    /// Any other `type` the server may send; ignored by the client.
    #[serde(other)]
    Other,
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
    use serde_json::json;

    #[test]
    fn identify_wire_shape() {
        let msg = ClientMessage::Identify {
            token: "secret".into(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"action": "identify", "token": "secret"})
        );
    }

    #[test]
    fn match_list_wire_shape() {
        let msg = ClientMessage::MatchList {
            game: CONNECT_FOUR.into(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"action": "match-list", "game": "Connect Four"})
        );
    }

    #[test]
    fn join_uses_match_key() {
        let msg = ClientMessage::Join {
            match_id: "m1".into(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"action": "join", "match": "m1"})
        );
    }

    #[test]
    fn action_carries_column_payload() {
        let msg = ClientMessage::Action {
            match_id: "m1".into(),
            payload: MovePayload { col: 3 },
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"action": "action", "match": "m1", "payload": {"col": 3}})
        );
    }

    #[test]
    fn decodes_identified() {
        let msg: ServerMessage = serde_json::from_str(r#"{"type":"identified"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Identified);
    }

    #[test]
    fn decodes_open_lobbies_ignoring_extra_fields() {
        let raw = r#"{"type":"open-lobbies","matches":[{"match":"a","players":1},{"match":"b"}]}"#;
        let ServerMessage::OpenLobbies { matches } = serde_json::from_str(raw).unwrap() else {
            panic!("expected OpenLobbies");
        };
        let ids: Vec<_> = matches.iter().map(|m| m.match_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn decodes_game_update() {
        let raw = r#"{"type":"game-update","activePlayer":2,"slot":2,
            "state":{"board":[[1],[],[],[],[],[],[]]},"gi":{"match":"m1","game":"Connect Four"}}"#;
        let ServerMessage::GameUpdate(update) = serde_json::from_str(raw).unwrap() else {
            panic!("expected GameUpdate");
        };
        assert!(update.is_our_turn());
        assert_eq!(update.gi.match_id, "m1");
        assert_eq!(update.state.board.len(), 7);
        assert_eq!(update.state.board[0].len(), 1);
    }

    #[test]
    fn missing_active_player_is_not_our_turn() {
        let raw = r#"{"type":"game-update","slot":0,"state":{"board":[]},"gi":{"match":"m1"}}"#;
        let ServerMessage::GameUpdate(update) = serde_json::from_str(raw).unwrap() else {
            panic!("expected GameUpdate");
        };
        assert_eq!(update.active_player, None);
        assert!(!update.is_our_turn());
    }

    #[test]
    fn null_active_player_is_not_our_turn() {
        let raw =
            r#"{"type":"game-update","activePlayer":null,"slot":0,"state":{"board":[]},"gi":{"match":"m1"}}"#;
        let ServerMessage::GameUpdate(update) = serde_json::from_str(raw).unwrap() else {
            panic!("expected GameUpdate");
        };
        assert!(!update.is_our_turn());
    }

    #[test]
    fn unknown_type_decodes_as_other() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"chat","text":"hello"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Other);
    }

    #[test]
    fn wrong_shape_is_an_error_not_a_panic() {
        let raw = r#"{"type":"open-lobbies","matches":"none"}"#;
        assert!(serde_json::from_str::<ServerMessage>(raw).is_err());

        let raw = r#"{"type":"game-update","activePlayer":"me","slot":0,"state":{"board":[]},"gi":{"match":"m"}}"#;
        assert!(serde_json::from_str::<ServerMessage>(raw).is_err());
    }

    #[test]
    fn keepalive_is_not_json() {
        assert!(serde_json::from_str::<serde_json::Value>(KEEPALIVE_FRAME).is_err());
    }
}
