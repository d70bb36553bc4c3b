#![no_main]

use libfuzzer_sys::fuzz_target;
use tally::{Engine, GameState};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(state) = GameState::from_json(s) {
            let engine = Engine::new();
            let _ = engine.check(&state);
            for session in &state.sessions {
                let _ = engine.scoreboard(&state, &session.id, None);
                let _ = engine.run_cycle(&state, &session.id);
            }
        }
    }
});
