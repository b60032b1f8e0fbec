#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary frames must decode to a message or an error, never panic.
    let _ = serde_json::from_slice::<arena_bot::protocol::ServerMessage>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(arena_bot::protocol::ServerMessage::GameUpdate(update)) =
            serde_json::from_str::<arena_bot::protocol::ServerMessage>(s)
        {
            let _ = arena_bot::strategy::first_open_column(&update.state.board);
        }
    }
});
