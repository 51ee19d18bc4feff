//! Fuzz target for the prototxt parser.
//!
//! The lexer and parser must never panic on malformed input, and must
//! reject deep nesting instead of overflowing the stack.

#![no_main]

use libfuzzer_sys::fuzz_target;
use protonet::text::Parser;

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(message) = Parser::new().parse(text) {
            // Printed output must parse again.
            let printed = message.to_string();
            assert!(Parser::new().parse(&printed).is_ok());
        }
    }
});
