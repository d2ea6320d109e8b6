#![no_main]

use libfuzzer_sys::fuzz_target;
use peer_tictactoe::codec;

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };
    // Anything pasted by a user must decode or fail cleanly, and whatever
    // decodes must survive a re-encode.
    if let Ok(description) = codec::decode(token) {
        let code = codec::encode(&description).expect("decoded descriptions re-encode");
        assert_eq!(codec::decode(&code).ok(), Some(description));
    }
});
