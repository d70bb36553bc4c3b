#![no_main]

use libfuzzer_sys::fuzz_target;
use tally::formula::{evaluate, extract_references, validate, StaticResolver};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let resolver = StaticResolver::new().with("x", 100.0).with("y", 50.0);

        let _ = validate(s);
        let _ = extract_references(s);
        let _ = evaluate(s, &resolver);
    }
});
