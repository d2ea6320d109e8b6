#![no_main]

use libfuzzer_sys::fuzz_target;
use peer_tictactoe::game::GameState;
use peer_tictactoe::sync;
use peer_tictactoe::{Role, WireMessage};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(message) = WireMessage::parse(text) else {
        return;
    };
    // No inbound frame may panic the reducer, on either side.
    for role in [Role::Host, Role::Join] {
        let mut state = GameState::new();
        let _ = sync::apply_message(&mut state, role, &message);
    }
});
