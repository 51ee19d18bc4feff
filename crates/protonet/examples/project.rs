//! Example: validate a network and print one phase of it.
//!
//! Usage:
//!   cargo run --example project -- <file_path> <phase>
//!
//! Example:
//!   RUST_LOG=debug cargo run --example project -- test_data/lenet.prototxt deploy

use std::env;
use std::process;

use protonet::{Network, Phase};

fn main() -> protonet::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: cargo run --example project -- <file_path> <phase>");
        eprintln!("\nPhases: train, val, trainval, deploy");
        process::exit(1);
    }

    let phase: Phase = args[2].parse()?;

    let mut network = Network::new();
    network.load_file(&args[1])?;

    if let Some(source) = network.source() {
        eprintln!("# {} layers, {}", source.layer_count, source.hash);
    }

    if let Err(e) = network.validate() {
        eprintln!("# warning: {}", e);
    }

    print!("{}", network.project(phase)?);
    Ok(())
}
