//! Events emitted by the background session task.

use crate::protocol::{LobbyEntry, MatchId};

/// Something that happened during the session, delivered on the channel
/// returned by [`ArenaClient::start`](crate::client::ArenaClient::start).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaEvent {
    /// The session task is running. Always the first event.
    Connected,
    /// The server accepted the identify token.
    Identified,
    /// The server answered a match search.
    LobbiesListed { matches: Vec<LobbyEntry> },
    /// A `join` action was sent for this match.
    MatchJoined { match_id: MatchId },
    /// A move was played in response to a game update.
    MovePlayed { match_id: MatchId, col: u8 },
    /// It was our turn but every column is full; nothing was sent.
    BoardFull { match_id: MatchId },
    /// The session ended. `reason` is `None` when the server closed cleanly.
    /// Always the last event.
    Disconnected { reason: Option<String> },
}
