//! Fuzz target for loading, projecting and editing networks.

#![no_main]

use libfuzzer_sys::fuzz_target;
use protonet::{Network, Phase};

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut network = Network::new();
    if network.load_text(text).is_err() {
        return;
    }

    let _ = network.validate();
    for phase in Phase::ALL {
        assert!(network.project(phase).is_ok());
    }

    for phase in [Phase::Train, Phase::Val] {
        let _ = network.set_data_source_lmdb(phase, &["data", "label"], "fuzz_db", false);
        let _ = network.set_data_source_lmdb(phase, &["data", "label"], "fuzz_db", true);
    }
    let _ = network.validate();
});
