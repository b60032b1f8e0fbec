//! Integration tests for the arena session.
//!
//! Uses the scripted `MockTransport` from `tests/common` to push server frames
//! and check what the client sends back, including the timer-driven actions
//! (tokio's paused clock keeps these fast and deterministic).

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

mod common;

use std::time::Duration;

use arena_bot::{ArenaClient, ArenaConfig, ArenaError, ArenaEvent};
use serde_json::json;
use tokio::sync::mpsc;

use common::{
    frame, game_update_json, identified_json, open_lobbies_json, sent_actions, sent_json,
    MockTransport, Scripted,
};

#[allow(clippy::type_complexity)]
fn start_client(
    incoming: Vec<Scripted>,
    config: ArenaConfig,
) -> (
    ArenaClient,
    mpsc::Receiver<ArenaEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let (transport, sent, closed) = MockTransport::new(incoming);
    let (client, events) = ArenaClient::start(transport, config).expect("valid config");
    (client, events, sent, closed)
}

/// Collect events until `pred` matches, returning everything seen.
async fn events_until(
    rx: &mut mpsc::Receiver<ArenaEvent>,
    pred: impl Fn(&ArenaEvent) -> bool,
) -> Vec<ArenaEvent> {
    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        let done = pred(&event);
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}

// ════════════════════════════════════════════════════════════════════
// Full flow
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn identify_search_join_play() {
    let (mut client, mut events, sent, _closed) = start_client(
        vec![
            frame(identified_json()),
            frame(open_lobbies_json(&["match-42"])),
            frame(game_update_json(Some(1), 1, [6, 6, 3, 0, 0, 0, 0], "match-42")),
        ],
        ArenaConfig::new("secret-token"),
    );

    let seen = events_until(&mut events, |e| matches!(e, ArenaEvent::MovePlayed { .. })).await;
    assert_eq!(
        seen,
        vec![
            ArenaEvent::Connected,
            ArenaEvent::Identified,
            ArenaEvent::LobbiesListed {
                matches: vec![arena_bot::protocol::LobbyEntry {
                    match_id: "match-42".into()
                }]
            },
            ArenaEvent::MatchJoined {
                match_id: "match-42".into()
            },
            ArenaEvent::MovePlayed {
                match_id: "match-42".into(),
                col: 2
            },
        ]
    );
    assert!(client.is_identified());
    assert_eq!(client.current_match().await.as_deref(), Some("match-42"));

    // Let the scheduler run through identify and one search.
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    assert_eq!(
        sent_json(&sent),
        vec![
            json!({"action": "join", "match": "match-42"}),
            json!({"action": "action", "match": "match-42", "payload": {"col": 2}}),
            json!({"action": "identify", "token": "secret-token"}),
            json!({"action": "match-list", "game": "Connect Four"}),
        ]
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Game updates
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn scenario_empty_board_plays_column_zero() {
    let update = json!({
        "type": "game-update", "activePlayer": 2, "slot": 2,
        "state": {"board": [[], [], [], [], [], [], []]},
        "gi": {"match": "m1"}
    });
    let (mut client, mut events, sent, _closed) =
        start_client(vec![frame(update)], ArenaConfig::new("t"));

    events_until(&mut events, |e| matches!(e, ArenaEvent::MovePlayed { .. })).await;
    assert_eq!(
        sent_actions(&sent, "action"),
        vec![json!({"action": "action", "match": "m1", "payload": {"col": 0}})]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn scenario_full_first_column_plays_column_one() {
    let (mut client, mut events, sent, _closed) = start_client(
        vec![frame(game_update_json(
            Some(2),
            2,
            [6, 0, 0, 0, 0, 0, 0],
            "m1",
        ))],
        ArenaConfig::new("t"),
    );

    events_until(&mut events, |e| matches!(e, ArenaEvent::MovePlayed { .. })).await;
    assert_eq!(
        sent_actions(&sent, "action"),
        vec![json!({"action": "action", "match": "m1", "payload": {"col": 1}})]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn one_move_per_qualifying_update() {
    let (mut client, mut events, sent, _closed) = start_client(
        vec![
            frame(game_update_json(Some(0), 0, [0; 7], "m1")),
            frame(game_update_json(Some(1), 0, [1, 0, 0, 0, 0, 0, 0], "m1")),
            frame(game_update_json(Some(0), 0, [6, 6, 6, 6, 6, 5, 6], "m1")),
            frame(game_update_json(None, 0, [6, 6, 6, 6, 6, 6, 6], "m1")),
            frame(identified_json()),
        ],
        ArenaConfig::new("t"),
    );

    events_until(&mut events, |e| matches!(e, ArenaEvent::Identified)).await;
    let cols: Vec<_> = sent_actions(&sent, "action")
        .iter()
        .map(|v| v["payload"]["col"].as_u64().unwrap())
        .collect();
    assert_eq!(cols, vec![0, 5]);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn full_board_emits_board_full_and_sends_nothing() {
    let (mut client, mut events, sent, _closed) = start_client(
        vec![frame(game_update_json(Some(1), 1, [6; 7], "m7"))],
        ArenaConfig::new("t"),
    );

    let seen = events_until(&mut events, |e| matches!(e, ArenaEvent::BoardFull { .. })).await;
    assert_eq!(
        seen.last(),
        Some(&ArenaEvent::BoardFull {
            match_id: "m7".into()
        })
    );
    assert!(sent_actions(&sent, "action").is_empty());

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Lobbies
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn scenario_empty_lobby_list_sends_nothing() {
    let (mut client, mut events, sent, _closed) = start_client(
        vec![
            frame(json!({"type": "open-lobbies", "matches": []})),
            frame(identified_json()),
        ],
        ArenaConfig::new("t"),
    );

    events_until(&mut events, |e| matches!(e, ArenaEvent::Identified)).await;
    assert!(sent_json(&sent).is_empty());
    assert!(client.current_match().await.is_none());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn later_lobby_listings_do_not_join_again() {
    let (mut client, mut events, sent, _closed) = start_client(
        vec![
            frame(open_lobbies_json(&["first", "second"])),
            frame(open_lobbies_json(&["third"])),
            frame(identified_json()),
        ],
        ArenaConfig::new("t"),
    );

    events_until(&mut events, |e| matches!(e, ArenaEvent::Identified)).await;
    assert_eq!(
        sent_actions(&sent, "join"),
        vec![json!({"action": "join", "match": "first"})]
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Scheduler
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn custom_cadence_is_honoured() {
    let config = ArenaConfig::new("t")
        .with_game("Tic Tac Toe")
        .with_identify_delay(Duration::from_millis(100))
        .with_search_interval(Duration::from_millis(500))
        .with_keepalive_interval(Duration::from_secs(2));
    let (mut client, _events, sent, _closed) =
        start_client(vec![frame(identified_json())], config);

    tokio::time::sleep(Duration::from_millis(2_050)).await;

    assert_eq!(sent_actions(&sent, "identify").len(), 1);
    let searches = sent_actions(&sent, "match-list");
    assert_eq!(searches.len(), 4);
    assert_eq!(searches[0], json!({"action": "match-list", "game": "Tic Tac Toe"}));
    assert_eq!(
        sent.lock().unwrap().iter().filter(|s| *s == "PING").count(),
        1
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn search_waits_for_identification() {
    let (mut client, _events, sent, _closed) = start_client(vec![], ArenaConfig::new("t"));

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(sent_actions(&sent, "identify").len(), 1);
    assert!(sent_actions(&sent, "match-list").is_empty());

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn connected_is_first_and_disconnected_is_last() {
    let (_client, mut events, _sent, _closed) = start_client(
        vec![frame(identified_json()), None],
        ArenaConfig::new("t"),
    );

    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            ArenaEvent::Connected,
            ArenaEvent::Identified,
            ArenaEvent::Disconnected { reason: None },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn receive_error_disconnects_without_reconnecting() {
    let (client, mut events, sent, _closed) = start_client(
        vec![Some(Err(ArenaError::TransportReceive("reset by peer".into())))],
        ArenaConfig::new("t"),
    );

    let seen = events_until(&mut events, |e| matches!(e, ArenaEvent::Disconnected { .. })).await;
    let Some(ArenaEvent::Disconnected { reason: Some(reason) }) = seen.last() else {
        panic!("expected Disconnected with a reason, got {seen:?}");
    };
    assert!(reason.contains("reset by peer"));
    assert!(!client.is_connected());

    // The session is over: no timers fire afterwards.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_transport_within_timeout() {
    let (mut client, mut events, _sent, closed) =
        start_client(vec![frame(identified_json())], ArenaConfig::new("t"));
    events_until(&mut events, |e| matches!(e, ArenaEvent::Identified)).await;

    let began = tokio::time::Instant::now();
    client.shutdown().await;

    assert!(closed.load(std::sync::atomic::Ordering::Relaxed));
    assert!(began.elapsed() <= Duration::from_millis(1_100));
    assert!(!client.is_connected());

    let seen = events_until(&mut events, |e| matches!(e, ArenaEvent::Disconnected { .. })).await;
    assert_eq!(
        seen.last(),
        Some(&ArenaEvent::Disconnected {
            reason: Some("client shut down".into())
        })
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_config_is_rejected_before_spawning() {
    let (transport, _sent, _closed) = MockTransport::new(vec![]);
    let err = ArenaClient::start(transport, ArenaConfig::new("")).unwrap_err();
    assert!(matches!(err, ArenaError::InvalidConfig(_)));
}
