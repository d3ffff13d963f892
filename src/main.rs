//! Parking engine CLI
//!
//! Replays a CSV of gate scans against a CSV of lot definitions and writes
//! the resulting transactions to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --lots lots.csv scans.csv > transactions.csv
//! cargo run -- --lots lots.csv --strategy async scans.csv > transactions.csv
//! cargo run -- --lots lots.csv --strategy async --batch-size 2000 --max-concurrent 8 scans.csv
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to adjust verbosity.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, ledger unavailable, output failure, etc.)

use parking_session_engine::cli;
use parking_session_engine::strategy;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let strategy = {
        let config = if args.strategy == cli::StrategyType::Async {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.lots_file, &args.scans_file, &mut output) {
        error!(error = %e, "processing failed");
        process::exit(1);
    }
}
