//! Asynchronous batch processing strategy
//!
//! Multi-threaded implementation of the ProcessingStrategy trait. Scans are
//! read in batches and each batch is partitioned by session key, so
//! different `(vehicle, lot)` pairs are processed in parallel while scans
//! of one pair keep their input order.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (session-key partitioning + tokio tasks)
//!     └── AsyncTransactionEngine (thread-safe processing)
//!         ├── AsyncSessionTracker (open sessions, per-pair locking)
//!         └── AsyncLedger (recorded transactions)
//! ```
//!
//! Batches are processed one after another. A pair whose scans span two
//! batches therefore still sees them in file order.

use crate::core::r#async::{AsyncLedger, AsyncSessionTracker, AsyncTransactionEngine, BatchProcessor};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{read_lots, write_transactions_csv};
use crate::strategy::ProcessingStrategy;
use crate::types::ParkingError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of scans per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig; zero values fall back to the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "invalid batch_size 0, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches 0, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Runs the batch pipeline on a dedicated multi-threaded tokio runtime
    ///
    /// The first ledger failure aborts processing; every other per-scan
    /// outcome is already a recorded transaction.
    fn process(
        &self,
        lots_path: &Path,
        scans_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let lots = read_lots(lots_path).map_err(|e| e.to_string())?;
        info!(lots = lots.len(), "loaded parking lots");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let tracker = Arc::new(AsyncSessionTracker::new());
            let ledger = Arc::new(AsyncLedger::new());
            let engine = Arc::new(AsyncTransactionEngine::new(
                Arc::new(lots),
                Arc::clone(&tracker),
                Arc::<AsyncLedger>::clone(&ledger),
            ));
            let processor = BatchProcessor::new(engine);

            let file = tokio::fs::File::open(scans_path)
                .await
                .map_err(|e| ParkingError::open_failed(scans_path, e).to_string())?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let results = processor.process_batch(batch).await.map_err(|e| {
                    error!(error = %e, "scan processing aborted");
                    e.to_string()
                })?;

                for processed in results {
                    match processed.result {
                        Ok(_) => {}
                        Err(e) if e.is_recoverable() => {
                            warn!(tx = processed.event.sequence, error = %e, "skipping scan")
                        }
                        Err(e) => {
                            error!(tx = processed.event.sequence, error = %e, "scan processing aborted");
                            return Err(e.to_string());
                        }
                    }
                }
            }

            let transactions = ledger.transactions();
            info!(
                transactions = transactions.len(),
                open_sessions = tracker.open_sessions().len(),
                "scan processing finished"
            );

            write_transactions_csv(&transactions, output).map_err(|e| e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_batch_config_zero_values_fall_back_to_defaults() {
        let config = BatchConfig::new(0, 0);
        let default = BatchConfig::default();

        assert_eq!(config.batch_size, default.batch_size);
        assert_eq!(config.max_concurrent_batches, default.max_concurrent_batches);
    }

    #[test]
    fn test_async_strategy_entry_then_exit() {
        let lots = create_temp_csv("lot,rate\nL1,10\n");
        let scans = create_temp_csv(
            "payload,lot,timestamp\n\
             KA01AB1234|v1,L1,2024-01-01T08:00:00Z\n\
             KA01AB1234|v1,L1,2024-01-01T09:00:00Z\n",
        );

        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();
        strategy
            .process(lots.path(), scans.path(), &mut output)
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.ends_with("2,2024-01-01T09:00:00Z,L1,KA01AB1234,v1,exit,Success,10.00,\n"));
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let lots = create_temp_csv("lot,rate\nL1,10\n");
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(lots.path(), Path::new("nonexistent.csv"), &mut output);
        assert_eq!(result.unwrap_err(), "File not found: nonexistent.csv");
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        let lots = create_temp_csv("lot,rate\nL1,10\n");
        let scans = create_temp_csv(
            "payload,lot,timestamp\n\
             KA01AB1234|v1,L1,2024-01-01T08:00:00Z\n\
             MH12XY0001|v2,L1,2024-01-01T08:00:00Z\n\
             KA01AB1234|v1,L1,2024-01-01T08:30:00Z\n\
             MH12XY0001|v2,L1,2024-01-01T10:00:00Z\n\
             KA01AB1234|v1,L1,2024-01-01T09:00:00Z\n",
        );

        // Batch size 2 splits each vehicle's scans across batches
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(2, 2));
        let mut output = Vec::new();
        strategy
            .process(lots.path(), scans.path(), &mut output)
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[3], "3,2024-01-01T08:30:00Z,L1,KA01AB1234,v1,exit,Success,5.00,");
        assert_eq!(lines[4], "4,2024-01-01T10:00:00Z,L1,MH12XY0001,v2,exit,Success,20.00,");
        assert_eq!(lines[5], "5,2024-01-01T09:00:00Z,L1,KA01AB1234,v1,entry,Success,0.00,");
    }

    #[test]
    fn test_async_strategy_skips_batches_of_bad_rows() {
        let lots = create_temp_csv("lot,rate\nL1,10\n");
        let scans = create_temp_csv(
            "payload,lot,timestamp\n\
             KA01AB1234|v1,L1,later\n\
             KA01AB1234|v1,L1,sooner\n\
             KA01AB1234|v1,L1,2024-01-01T08:00:00Z\n",
        );

        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(1, 1));
        let mut output = Vec::new();
        strategy
            .process(lots.path(), scans.path(), &mut output)
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("3,2024-01-01T08:00:00Z,L1,KA01AB1234,v1,entry,Success"));
    }
}
