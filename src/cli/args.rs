use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay parking-lot QR scans and report the resulting transactions
#[derive(Parser, Debug)]
#[command(name = "parking-engine")]
#[command(about = "Replay parking-lot QR scans and report entry/exit transactions", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing scan events
    #[arg(value_name = "SCANS", help = "Path to the scans CSV file")]
    pub scans_file: PathBuf,

    /// Lot definitions with their rate policies
    #[arg(
        long = "lots",
        value_name = "LOTS",
        help = "Path to the lots CSV file (lot,rate,unit_seconds,currency_scale)"
    )]
    pub lots_file: PathBuf,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for single-threaded or 'async' for batched concurrent processing"
    )]
    pub strategy: StrategyType,

    /// Number of scans per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of scans per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Build a BatchConfig from the CLI arguments, filling gaps with defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_none() && self.max_concurrent_batches.is_none() {
            return BatchConfig::default();
        }

        let default = BatchConfig::default();
        BatchConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.max_concurrent_batches
                .unwrap_or(default.max_concurrent_batches),
        )
    }
}
