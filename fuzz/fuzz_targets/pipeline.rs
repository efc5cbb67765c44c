#![no_main]

use libfuzzer_sys::fuzz_target;
use tacopt::{compiler::Pipeline, tac::parse_tac};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(mut decls) = parse_tac(text) {
        let _ = Pipeline::default().run(&mut decls);
    }
});
