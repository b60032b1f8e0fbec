//! `arena-bot` command-line entry point.
//!
//! ```sh
//! ARENA_TOKEN=… arena-bot --addr arena.example:8080
//! ARENA_TOKEN=… arena-bot -addr arena.example:8080   # same thing
//! RUST_LOG=arena_bot=trace arena-bot --token …   # log every frame
//! ```

use std::ffi::OsString;

use clap::Parser;

use arena_bot::{live_url, ArenaClient, ArenaConfig, ArenaEvent, WebSocketTransport};

#[derive(Parser)]
#[command(name = "arena-bot")]
#[command(about = "Plays Connect Four on an AI arena server, always in the first open column")]
struct Args {
    /// Arena host, optionally with `:port`. `-addr` is accepted as well.
    #[arg(long, default_value = "localhost")]
    addr: String,

    /// Identify token issued by the arena.
    #[arg(long, env = "ARENA_TOKEN", hide_env_values = true)]
    token: String,

    /// Game to search lobbies for.
    #[arg(long, default_value = arena_bot::protocol::CONNECT_FOUR)]
    game: String,

    /// Stop polling for lobbies once a match has been joined.
    #[arg(long)]
    stop_search_after_join: bool,
}

/// Rewrite the single-dash `-addr` / `-addr=<host>` spelling to `--addr`.
///
/// Arguments after a bare `--` are left alone.
fn single_dash_addr(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut rest_is_positional = false;
    args.into_iter()
        .map(|arg| {
            if rest_is_positional {
                return arg;
            }
            match arg.to_str() {
                Some("--") => {
                    rest_is_positional = true;
                    arg
                }
                Some("-addr") => OsString::from("--addr"),
                Some(s) if s.starts_with("-addr=") => OsString::from(format!("-{s}")),
                _ => arg,
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse_from(single_dash_addr(std::env::args_os()));

    let config = ArenaConfig::new(args.token)
        .with_game(args.game)
        .with_stop_search_after_join(args.stop_search_after_join);
    config.validate()?;

    let url = live_url(&args.addr);
    tracing::info!("connecting to {url}");

    let transport = WebSocketTransport::connect(&url)
        .await
        .inspect_err(|e| tracing::error!("dial: {e}"))?;

    let (mut client, mut events) = ArenaClient::start(transport, config)?;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut listening = true;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                match event {
                    ArenaEvent::Connected => tracing::debug!("session started"),
                    ArenaEvent::Identified => tracing::info!("identified"),
                    ArenaEvent::LobbiesListed { matches } => {
                        tracing::info!("{} open lobbies", matches.len());
                    }
                    ArenaEvent::MatchJoined { match_id } => {
                        tracing::info!("joined match {match_id}");
                    }
                    ArenaEvent::MovePlayed { match_id, col } => {
                        tracing::info!("match {match_id}: played column {col}");
                    }
                    ArenaEvent::BoardFull { match_id } => {
                        tracing::info!("match {match_id}: board full, nothing to play");
                    }
                    ArenaEvent::Disconnected { reason } => {
                        let reason = reason.as_deref().unwrap_or("closed by server");
                        tracing::info!("disconnected: {reason}");
                        break;
                    }
                }
            }

            result = &mut interrupt, if listening => {
                match result {
                    Ok(()) => {
                        tracing::info!("interrupt");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("failed to listen for interrupt: {e}");
                        listening = false;
                    }
                }
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
