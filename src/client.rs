//! Autonomous arena client.
//!
//! [`ArenaClient::start`] moves a connected [`Transport`] into a background
//! session task and returns a handle plus a bounded
//! [`tokio::sync::mpsc::Receiver<ArenaEvent>`].
//!
//! The session task is a single `tokio::select!` loop. One arm reads
//! frames from the server and reacts to them (identified, lobby listings, game
//! updates); the other arms are timers that decide when to identify, when to
//! send the keepalive and when to search for a match. Progress is:
//!
//! 1. `identify` once, [`ArenaConfig::identify_delay`] after start
//! 2. `match-list` every [`ArenaConfig::search_interval`] once identified
//! 3. `join` the first advertised lobby
//! 4. `action` with the first open column whenever it is our turn
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect(&live_url("localhost")).await?;
//! let (mut client, mut events) = ArenaClient::start(transport, ArenaConfig::new(token))?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ArenaEvent::MovePlayed { col, .. } => println!("played column {col}"),
//!         ArenaEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! client.shutdown().await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::error::{ArenaError, Result};
use crate::event::ArenaEvent;
use crate::protocol::{
    ClientMessage, GameUpdatePayload, MatchId, MovePayload, ServerMessage, CONNECT_FOUR,
    KEEPALIVE_FRAME,
};
use crate::strategy::first_open_column;
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

const DEFAULT_IDENTIFY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_SEARCH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Extra time the handle gives the session task, on top of the close
/// acknowledgement wait, before aborting it.
const SHUTDOWN_ABORT_GRACE: Duration = Duration::from_millis(50);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for an [`ArenaClient`] session.
///
/// The only required value is the identify token; everything else defaults
/// to the arena's usual cadence.
///
/// ```
/// use arena_bot::client::ArenaConfig;
/// use std::time::Duration;
///
/// let config = ArenaConfig::new("secret")
///     .with_search_interval(Duration::from_secs(10))
///     .with_stop_search_after_join(true);
/// assert_eq!(config.game, "Connect Four");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct ArenaConfig {
    /// Secret sent with the `identify` action.
    pub token: String,
    /// Game name sent with every `match-list` action.
    pub game: String,
    /// Delay between session start and the single `identify` action.
    pub identify_delay: Duration,
    /// Period of the `PING` keepalive frame.
    pub keepalive_interval: Duration,
    /// Period of the `match-list` search (skipped while not identified).
    pub search_interval: Duration,
    /// How long to wait for the server to acknowledge a close on shutdown.
    pub shutdown_timeout: Duration,
    /// Capacity of the bounded event channel. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Stop sending `match-list` once a match has been joined.
    ///
    /// Defaults to `false`: the search keeps running for the whole session.
    pub stop_search_after_join: bool,
}

impl ArenaConfig {
    /// Create a configuration with the given identify token and default values.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            game: CONNECT_FOUR.to_string(),
            identify_delay: DEFAULT_IDENTIFY_DELAY,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            search_interval: DEFAULT_SEARCH_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            stop_search_after_join: false,
        }
    }

    #[must_use]
    pub fn with_game(mut self, game: impl Into<String>) -> Self {
        self.game = game.into();
        self
    }

    #[must_use]
    pub fn with_identify_delay(mut self, delay: Duration) -> Self {
        self.identify_delay = delay;
        self
    }

    #[must_use]
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    #[must_use]
    pub fn with_search_interval(mut self, interval: Duration) -> Self {
        self.search_interval = interval;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_stop_search_after_join(mut self, stop: bool) -> Self {
        self.stop_search_after_join = stop;
        self
    }

    /// Check that the configuration can drive a session.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] if the token or game name is
    /// blank, or if a periodic interval is zero (tokio intervals panic on zero).
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(ArenaError::InvalidConfig("identify token is empty".into()));
        }
        if self.game.trim().is_empty() {
            return Err(ArenaError::InvalidConfig("game name is empty".into()));
        }
        if self.keepalive_interval.is_zero() {
            return Err(ArenaError::InvalidConfig(
                "keepalive interval must be non-zero".into(),
            ));
        }
        if self.search_interval.is_zero() {
            return Err(ArenaError::InvalidConfig(
                "search interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ArenaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaConfig")
            .field("token", &"<redacted>")
            .field("game", &self.game)
            .field("identify_delay", &self.identify_delay)
            .field("keepalive_interval", &self.keepalive_interval)
            .field("search_interval", &self.search_interval)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("event_channel_capacity", &self.event_channel_capacity)
            .field("stop_search_after_join", &self.stop_search_after_join)
            .finish()
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// State shared between the client handle and the session task.
struct SessionState {
    connected: AtomicBool,
    identified: AtomicBool,
    joined_match: Mutex<Option<MatchId>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            identified: AtomicBool::new(false),
            joined_match: Mutex::new(None),
        }
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a running arena session.
///
/// The session plays on its own; the handle only observes it and stops it.
pub struct ArenaClient {
    state: Arc<SessionState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl ArenaClient {
    /// Validate `config`, spawn the session task and return a handle plus the
    /// event receiver.
    ///
    /// The receiver yields [`ArenaEvent::Connected`] first and
    /// [`ArenaEvent::Disconnected`] last.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] if [`ArenaConfig::validate`] fails.
    pub fn start(
        transport: impl Transport,
        config: ArenaConfig,
    ) -> Result<(Self, mpsc::Receiver<ArenaEvent>)> {
        config.validate()?;

        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<ArenaEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = Arc::new(SessionState::new());
        let shutdown_timeout = config.shutdown_timeout;

        let task = tokio::spawn(session_loop(
            transport,
            config,
            event_tx,
            Arc::clone(&state),
            shutdown_rx,
        ));

        let client = Self {
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
        };

        Ok((client, event_rx))
    }

    /// Close the connection and stop the session task.
    ///
    /// Sends the close frame, gives the server up to
    /// [`ArenaConfig::shutdown_timeout`] to acknowledge, then returns. A
    /// session task that overruns is aborted. Calling this after the session
    /// has already ended is harmless.
    pub async fn shutdown(&mut self) {
        debug!("ArenaClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            let deadline = self.shutdown_timeout + SHUTDOWN_ABORT_GRACE;
            match tokio::time::timeout(deadline, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => warn!("session task terminated with join error: {join_err}"),
                Err(_) => {
                    warn!("session task did not exit within {deadline:?}; aborting");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session task aborted: {join_err}");
                    }
                }
            }
        }

        self.state.connected.store(false, Ordering::Release);
    }

    /// Returns `true` while the session is running.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Returns `true` once the server has accepted the identify token.
    pub fn is_identified(&self) -> bool {
        self.state.identified.load(Ordering::Acquire)
    }

    /// Returns the match this session joined, if any.
    pub async fn current_match(&self) -> Option<MatchId> {
        self.state.joined_match.lock().await.clone()
    }
}

impl std::fmt::Debug for ArenaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaClient")
            .field("connected", &self.is_connected())
            .field("identified", &self.is_identified())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for ArenaClient {
    fn drop(&mut self) {
        // No executor to drive a graceful close from a synchronous drop.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Background task: dispatches server frames and runs the outbound timers.
///
/// Exits when:
/// - the server closes the connection or a read fails
/// - any send fails
/// - the handle requests shutdown
async fn session_loop(
    mut transport: impl Transport,
    config: ArenaConfig,
    event_tx: mpsc::Sender<ArenaEvent>,
    state: Arc<SessionState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("session loop started");
    emit_event(&event_tx, ArenaEvent::Connected).await;

    let start = Instant::now();
    let identify = tokio::time::sleep_until(start + config.identify_delay);
    tokio::pin!(identify);
    let mut identify_pending = true;

    // Periodic timers first fire one full period after start.
    let mut keepalive =
        tokio::time::interval_at(start + config.keepalive_interval, config.keepalive_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut search =
        tokio::time::interval_at(start + config.search_interval, config.search_interval);
    search.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut searching = true;

    let reason = loop {
        tokio::select! {
            () = &mut identify, if identify_pending => {
                identify_pending = false;
                info!("identifying");
                let msg = ClientMessage::Identify { token: config.token.clone() };
                if let Err(e) = send_message(&mut transport, &msg).await {
                    error!("write: {e}");
                    break Some(format!("transport send error: {e}"));
                }
            }

            _ = keepalive.tick() => {
                trace!(">>> {KEEPALIVE_FRAME}");
                if let Err(e) = transport.send(KEEPALIVE_FRAME.to_string()).await {
                    error!("write: {e}");
                    break Some(format!("transport send error: {e}"));
                }
            }

            _ = search.tick(), if searching => {
                if !state.identified.load(Ordering::Acquire) {
                    info!("skipping match search, not identified");
                    continue;
                }
                info!(game = %config.game, "searching for a match");
                let msg = ClientMessage::MatchList { game: config.game.clone() };
                if let Err(e) = send_message(&mut transport, &msg).await {
                    error!("write: {e}");
                    break Some(format!("transport send error: {e}"));
                }
            }

            _ = &mut shutdown_rx => {
                info!("shutdown requested, closing connection");
                if let Err(e) = transport.close().await {
                    error!("write close: {e}");
                    break Some(format!("close error: {e}"));
                }
                await_close_ack(&mut transport, config.shutdown_timeout).await;
                break Some("client shut down".into());
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        let Some(reply) = handle_frame(&text, &state, &event_tx).await else {
                            continue;
                        };
                        if let Err(e) = send_message(&mut transport, &reply).await {
                            error!("write: {e}");
                            break Some(format!("transport send error: {e}"));
                        }
                        if let ClientMessage::Join { match_id } = &reply {
                            *state.joined_match.lock().await = Some(match_id.clone());
                            if config.stop_search_after_join {
                                debug!("match joined, stopping search");
                                searching = false;
                            }
                        }
                        if let Some(event) = sent_event(reply) {
                            emit_event(&event_tx, event).await;
                        }
                    }
                    Some(Err(e)) => {
                        error!("read: {e}");
                        break Some(format!("transport receive error: {e}"));
                    }
                    None => {
                        info!("connection closed by server");
                        break None;
                    }
                }
            }
        }
    };

    emit_disconnected(&event_tx, &state, reason).await;
    debug!("session loop exited");
}

/// Decode one inbound frame, update session state and decide the reply.
///
/// Frames that fail to decode are logged and ignored.
async fn handle_frame(
    text: &str,
    state: &SessionState,
    event_tx: &mpsc::Sender<ArenaEvent>,
) -> Option<ClientMessage> {
    trace!("<<< {text}");

    let msg = match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("failed to decode server message: {e}; raw: {text}");
            return None;
        }
    };

    match msg {
        ServerMessage::Identified => {
            state.identified.store(true, Ordering::Release);
            info!("identification successful");
            emit_event(event_tx, ArenaEvent::Identified).await;
            None
        }
        ServerMessage::OpenLobbies { matches } => {
            debug!(count = matches.len(), "open lobbies received");
            let first = matches.first().map(|lobby| lobby.match_id.clone());
            emit_event(event_tx, ArenaEvent::LobbiesListed { matches }).await;

            let match_id = first?;
            if let Some(joined) = state.joined_match.lock().await.as_deref() {
                debug!(joined, offered = %match_id, "already in a match, ignoring lobby");
                return None;
            }
            info!(match_id = %match_id, "game found, joining");
            Some(ClientMessage::Join { match_id })
        }
        ServerMessage::GameUpdate(update) => {
            if !update.is_our_turn() {
                trace!(active = ?update.active_player, slot = update.slot, "not our turn");
                return None;
            }
            let GameUpdatePayload {
                state: game, gi, ..
            } = *update;
            let match_id = gi.match_id;
            match first_open_column(&game.board) {
                Some(col) => Some(ClientMessage::Action {
                    match_id,
                    payload: MovePayload { col },
                }),
                None => {
                    debug!(match_id = %match_id, "board is full, no move to play");
                    emit_event(event_tx, ArenaEvent::BoardFull { match_id }).await;
                    None
                }
            }
        }
        ServerMessage::Other => {
            debug!("ignoring unhandled server message");
            None
        }
    }
}

/// Event to report once `msg` has been written to the transport.
fn sent_event(msg: ClientMessage) -> Option<ArenaEvent> {
    match msg {
        ClientMessage::Join { match_id } => Some(ArenaEvent::MatchJoined { match_id }),
        ClientMessage::Action { match_id, payload } => Some(ArenaEvent::MovePlayed {
            match_id,
            col: payload.col,
        }),
        ClientMessage::Identify { .. } | ClientMessage::MatchList { .. } => None,
    }
}

async fn send_message(transport: &mut impl Transport, msg: &ClientMessage) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    trace!(">>> {json}");
    transport.send(json).await
}

/// After sending the close frame, keep reading until the server finishes the
/// close handshake or `timeout` elapses.
async fn await_close_ack(transport: &mut impl Transport, timeout: Duration) {
    let drain = async {
        // Frames arriving after the close frame are discarded, not dispatched.
        while let Some(Ok(_)) = transport.recv().await {}
    };
    if tokio::time::timeout(timeout, drain).await.is_err() {
        debug!("server did not acknowledge close within {timeout:?}");
    }
}

/// Emit an event without blocking the session. A full channel drops the
/// event with a warning.
async fn emit_event(event_tx: &mpsc::Sender<ArenaEvent>, event: ArenaEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Mark the session ended and emit [`ArenaEvent::Disconnected`].
///
/// Uses a blocking `send().await` because `Disconnected` is always the last
/// event and must not be dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<ArenaEvent>,
    state: &SessionState,
    reason: Option<String>,
) {
    state.connected.store(false, Ordering::Release);
    state.identified.store(false, Ordering::Release);
    if event_tx
        .send(ArenaEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio_test::{assert_err, assert_ok};

    // ── Mock transport ──────────────────────────────────────────────

    type Script = Vec<Option<std::result::Result<String, ArenaError>>>;

    /// Records sent frames and replays scripted inbound frames.
    struct MockTransport {
        incoming: VecDeque<Option<std::result::Result<String, ArenaError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(incoming: Script) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
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
        async fn send(&mut self, message: String) -> std::result::Result<(), ArenaError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ArenaError>> {
            match self.incoming.pop_front() {
                Some(item) => item,
                // Script exhausted: stay silent until shutdown.
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), ArenaError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    /// Transport whose writes always fail.
    struct BrokenWriteTransport;

    #[async_trait]
    impl Transport for BrokenWriteTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), ArenaError> {
            Err(ArenaError::TransportSend("broken pipe".into()))
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ArenaError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), ArenaError> {
            Ok(())
        }
    }

    /// Silent until closed, then delivers a game update before the close ack.
    struct LateUpdateTransport {
        closed: bool,
        late: VecDeque<String>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for LateUpdateTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), ArenaError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ArenaError>> {
            if !self.closed {
                return std::future::pending().await;
            }
            self.late.pop_front().map(Ok)
        }

        async fn close(&mut self) -> std::result::Result<(), ArenaError> {
            self.closed = true;
            Ok(())
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn frame(value: Value) -> Option<std::result::Result<String, ArenaError>> {
        Some(Ok(value.to_string()))
    }

    fn identified() -> Option<std::result::Result<String, ArenaError>> {
        frame(json!({"type": "identified"}))
    }

    fn lobbies(ids: &[&str]) -> Option<std::result::Result<String, ArenaError>> {
        let matches: Vec<Value> = ids.iter().map(|id| json!({"match": id})).collect();
        frame(json!({"type": "open-lobbies", "matches": matches}))
    }

    fn sent_values(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<Value> {
        sent.lock()
            .unwrap()
            .iter()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect()
    }

    fn count_action(sent: &Arc<StdMutex<Vec<String>>>, action: &str) -> usize {
        sent_values(sent)
            .iter()
            .filter(|v| v["action"] == action)
            .count()
    }

    async fn next_event(events: &mut mpsc::Receiver<ArenaEvent>) -> ArenaEvent {
        events.recv().await.expect("event channel closed")
    }

    type Started = (
        ArenaClient,
        mpsc::Receiver<ArenaEvent>,
        Arc<StdMutex<Vec<String>>>,
        Arc<AtomicBool>,
    );

    fn start(incoming: Script) -> Started {
        let (transport, sent, closed) = MockTransport::new(incoming);
        let (client, events) = ArenaClient::start(transport, ArenaConfig::new("tok")).unwrap();
        (client, events, sent, closed)
    }

    // ── Configuration ───────────────────────────────────────────────

    #[test]
    fn config_defaults() {
        let config = ArenaConfig::new("tok");
        assert_eq!(config.game, "Connect Four");
        assert_eq!(config.identify_delay, Duration::from_secs(1));
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
        assert_eq!(config.search_interval, Duration::from_secs(5));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert!(!config.stop_search_after_join);
    }

    #[test]
    fn config_rejects_blank_token_and_zero_intervals() {
        assert!(matches!(
            ArenaConfig::new("  ").validate(),
            Err(ArenaError::InvalidConfig(_))
        ));
        assert_err!(ArenaConfig::new("tok")
            .with_search_interval(Duration::ZERO)
            .validate());
        assert_err!(ArenaConfig::new("tok")
            .with_keepalive_interval(Duration::ZERO)
            .validate());
        assert_err!(ArenaConfig::new("tok").with_game("").validate());
        assert_ok!(ArenaConfig::new("tok")
            .with_identify_delay(Duration::ZERO)
            .validate());
    }

    #[test]
    fn config_debug_redacts_token() {
        let rendered = format!("{:?}", ArenaConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        assert_eq!(
            ArenaConfig::new("tok")
                .with_event_channel_capacity(0)
                .event_channel_capacity,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_invalid_config() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let result = ArenaClient::start(transport, ArenaConfig::new(""));
        assert!(matches!(result, Err(ArenaError::InvalidConfig(_))));
    }

    // ── Scheduler ───────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn identify_is_sent_once_after_one_second() {
        let (mut client, _events, sent, _closed) = start(vec![]);

        tokio::time::sleep(Duration::from_millis(990)).await;
        assert!(sent.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            sent_values(&sent),
            vec![json!({"action": "identify", "token": "tok"})]
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count_action(&sent, "identify"), 1);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn search_is_skipped_until_identified() {
        let (mut client, _events, sent, _closed) = start(vec![]);

        tokio::time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(count_action(&sent, "match-list"), 0);
        assert!(!client.is_identified());

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn search_runs_every_five_seconds_once_identified() {
        let (mut client, mut events, sent, _closed) = start(vec![identified()]);

        assert_eq!(next_event(&mut events).await, ArenaEvent::Connected);
        assert_eq!(next_event(&mut events).await, ArenaEvent::Identified);
        assert!(client.is_identified());

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(count_action(&sent, "match-list"), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count_action(&sent, "match-list"), 1);
        assert!(sent_values(&sent).contains(&json!({"action": "match-list", "game": "Connect Four"})));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count_action(&sent, "match-list"), 2);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_is_plain_ping_every_thirty_seconds() {
        let (mut client, _events, sent, _closed) = start(vec![]);

        tokio::time::sleep(Duration::from_millis(29_900)).await;
        assert!(!sent.lock().unwrap().iter().any(|s| s == "PING"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let pings = || sent.lock().unwrap().iter().filter(|s| *s == "PING").count();
        assert_eq!(pings(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(pings(), 2);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn search_continues_after_join_by_default() {
        let (mut client, _events, sent, _closed) = start(vec![identified(), lobbies(&["m1"])]);

        tokio::time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(count_action(&sent, "join"), 1);
        assert_eq!(count_action(&sent, "match-list"), 2);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn search_can_stop_after_join() {
        let (transport, sent, _closed) = MockTransport::new(vec![identified(), lobbies(&["m1"])]);
        let config = ArenaConfig::new("tok").with_stop_search_after_join(true);
        let (mut client, _events) = ArenaClient::start(transport, config).unwrap();

        tokio::time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(count_action(&sent, "join"), 1);
        assert_eq!(count_action(&sent, "match-list"), 0);

        client.shutdown().await;
    }

    // ── Dispatcher ──────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn first_lobby_is_joined() {
        let (mut client, mut events, sent, _closed) = start(vec![lobbies(&["m1", "m2"])]);

        assert_eq!(next_event(&mut events).await, ArenaEvent::Connected);
        assert!(matches!(
            next_event(&mut events).await,
            ArenaEvent::LobbiesListed { matches } if matches.len() == 2
        ));
        assert_eq!(
            next_event(&mut events).await,
            ArenaEvent::MatchJoined {
                match_id: "m1".into()
            }
        );
        assert!(sent_values(&sent).contains(&json!({"action": "join", "match": "m1"})));
        assert_eq!(client.current_match().await.as_deref(), Some("m1"));

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn empty_lobby_list_sends_nothing() {
        let (mut client, mut events, sent, _closed) = start(vec![lobbies(&[])]);

        assert_eq!(next_event(&mut events).await, ArenaEvent::Connected);
        assert_eq!(
            next_event(&mut events).await,
            ArenaEvent::LobbiesListed { matches: vec![] }
        );
        assert_eq!(count_action(&sent, "join"), 0);
        assert!(client.current_match().await.is_none());

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_match_is_joined_per_session() {
        let (mut client, mut events, sent, _closed) =
            start(vec![lobbies(&["m1"]), lobbies(&["m2"])]);

        let _ = next_event(&mut events).await; // Connected
        let _ = next_event(&mut events).await; // LobbiesListed
        let _ = next_event(&mut events).await; // MatchJoined
        let _ = next_event(&mut events).await; // LobbiesListed (second)

        let joins: Vec<Value> = sent_values(&sent)
            .into_iter()
            .filter(|v| v["action"] == "join")
            .collect();
        assert_eq!(joins, vec![json!({"action": "join", "match": "m1"})]);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn our_turn_on_empty_board_plays_column_zero() {
        let update = json!({
            "type": "game-update", "activePlayer": 2, "slot": 2,
            "state": {"board": [[], [], [], [], [], [], []]},
            "gi": {"match": "m1"}
        });
        let (mut client, mut events, sent, _closed) = start(vec![frame(update)]);

        let _ = next_event(&mut events).await; // Connected
        assert_eq!(
            next_event(&mut events).await,
            ArenaEvent::MovePlayed {
                match_id: "m1".into(),
                col: 0
            }
        );
        assert_eq!(
            sent_values(&sent),
            vec![json!({"action": "action", "match": "m1", "payload": {"col": 0}})]
        );

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn full_first_column_plays_column_one() {
        let update = json!({
            "type": "game-update", "activePlayer": 2, "slot": 2,
            "state": {"board": [[1, 2, 1, 2, 1, 2], [], [], [], [], [], []]},
            "gi": {"match": "m1"}
        });
        let (mut client, mut events, sent, _closed) = start(vec![frame(update)]);

        let _ = next_event(&mut events).await; // Connected
        let _ = next_event(&mut events).await; // MovePlayed
        assert_eq!(
            sent_values(&sent),
            vec![json!({"action": "action", "match": "m1", "payload": {"col": 1}})]
        );

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn other_players_turn_sends_nothing() {
        let board = json!([[], [], [], [], [], [], []]);
        let (mut client, mut events, sent, _closed) = start(vec![
            frame(json!({"type": "game-update", "activePlayer": 1, "slot": 0,
                "state": {"board": board}, "gi": {"match": "m1"}})),
            frame(json!({"type": "game-update", "slot": 0,
                "state": {"board": board}, "gi": {"match": "m1"}})),
            identified(),
        ]);

        let _ = next_event(&mut events).await; // Connected
        // Identified arrives after both updates have been handled.
        assert_eq!(next_event(&mut events).await, ArenaEvent::Identified);
        assert_eq!(count_action(&sent, "action"), 0);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn full_board_is_a_silent_no_op() {
        let full: Vec<Value> = (0..7).map(|_| json!([1, 2, 1, 2, 1, 2])).collect();
        let (mut client, mut events, sent, _closed) = start(vec![frame(json!({
            "type": "game-update", "activePlayer": 0, "slot": 0,
            "state": {"board": full}, "gi": {"match": "m9"}
        }))]);

        let _ = next_event(&mut events).await; // Connected
        assert_eq!(
            next_event(&mut events).await,
            ArenaEvent::BoardFull {
                match_id: "m9".into()
            }
        );
        assert_eq!(count_action(&sent, "action"), 0);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_ignored() {
        let (mut client, mut events, sent, _closed) = start(vec![
            Some(Ok("not json".into())),
            frame(json!({"type": "open-lobbies", "matches": "nope"})),
            frame(json!({"type": "welcome"})),
            lobbies(&["m3"]),
        ]);

        let _ = next_event(&mut events).await; // Connected
        let _ = next_event(&mut events).await; // LobbiesListed
        assert_eq!(
            next_event(&mut events).await,
            ArenaEvent::MatchJoined {
                match_id: "m3".into()
            }
        );
        assert_eq!(count_action(&sent, "join"), 1);
        assert!(client.is_connected());

        client.shutdown().await;
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn read_error_ends_session() {
        let (_client, mut events, _sent, _closed) =
            start(vec![Some(Err(ArenaError::TransportReceive("boom".into())))]);

        let _ = next_event(&mut events).await; // Connected
        let ArenaEvent::Disconnected { reason } = next_event(&mut events).await else {
            panic!("expected Disconnected");
        };
        assert!(reason.unwrap().contains("boom"));
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn server_close_ends_session_cleanly() {
        let (client, mut events, _sent, _closed) = start(vec![identified(), None]);

        let _ = next_event(&mut events).await; // Connected
        let _ = next_event(&mut events).await; // Identified
        assert_eq!(
            next_event(&mut events).await,
            ArenaEvent::Disconnected { reason: None }
        );
        assert!(!client.is_connected());
        assert!(!client.is_identified());
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_ends_session() {
        let (_client, mut events) =
            ArenaClient::start(BrokenWriteTransport, ArenaConfig::new("tok")).unwrap();

        let _ = next_event(&mut events).await; // Connected
        let ArenaEvent::Disconnected { reason } = next_event(&mut events).await else {
            panic!("expected Disconnected");
        };
        assert!(reason.unwrap().contains("broken pipe"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_sends_close_and_returns_within_a_second() {
        let (mut client, mut events, _sent, closed) = start(vec![]);
        let _ = next_event(&mut events).await; // Connected

        let began = Instant::now();
        client.shutdown().await;

        assert!(closed.load(Ordering::Relaxed));
        assert!(began.elapsed() <= Duration::from_millis(1_100));
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn frames_after_close_are_not_answered() {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let update = json!({
            "type": "game-update", "activePlayer": 1, "slot": 1,
            "state": {"board": [[], [], [], [], [], [], []]},
            "gi": {"match": "m1"}
        });
        let transport = LateUpdateTransport {
            closed: false,
            late: VecDeque::from([update.to_string()]),
            sent: Arc::clone(&sent),
        };
        let (mut client, mut events) =
            ArenaClient::start(transport, ArenaConfig::new("tok")).unwrap();
        assert_eq!(next_event(&mut events).await, ArenaEvent::Connected);

        client.shutdown().await;

        assert_eq!(count_action(&sent, "action"), 0);
        assert_eq!(
            next_event(&mut events).await,
            ArenaEvent::Disconnected {
                reason: Some("client shut down".into())
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn double_shutdown_does_not_panic() {
        let (mut client, _events, _sent, _closed) = start(vec![]);
        client.shutdown().await;
        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn debug_impl_for_client() {
        let (mut client, _events, _sent, _closed) = start(vec![]);
        let rendered = format!("{client:?}");
        assert!(rendered.contains("ArenaClient"));
        assert!(rendered.contains("connected"));
        client.shutdown().await;
    }
}
