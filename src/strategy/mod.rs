//! Processing strategy module for scan processing
//!
//! This module defines the Strategy pattern for complete scan processing
//! pipelines, covering lot loading, CSV parsing, the transaction engine and
//! output. Different implementations (synchronous, asynchronous batch) are
//! selected at runtime and produce identical output for the same input.

use crate::cli::StrategyType;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete scan processing pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Process scans from `scans_path` against the lots in `lots_path` and
    /// write the resulting transactions to `output`
    ///
    /// # Returns
    ///
    /// * `Ok(())` if all scans were processed (failed scans included)
    /// * `Err(String)` if a fatal error occurred
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either input file cannot be opened
    /// - The ledger reports itself unavailable
    /// - Output cannot be written
    ///
    /// Rows that cannot be parsed are logged and skipped. Scans rejected by
    /// the engine become failed transactions in the output.
    fn process(
        &self,
        lots_path: &Path,
        scans_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` is only used by the async strategy; `None` means defaults.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_strategies_produce_identical_output() {
        let lots = create_temp_csv("lot,rate\nL1,10\nL2,4.5\n");
        let scans = create_temp_csv(
            "payload,lot,timestamp,direction\n\
             KA01AB1234|v1,L1,2024-01-01T08:00:00Z,\n\
             MH12XY0001|v2,L2,2024-01-01T08:10:00Z,\n\
             bogus,L1,2024-01-01T08:20:00Z,\n\
             KA01AB1234|v1,L1,2024-01-01T09:30:00Z,\n\
             MH12XY0001|v2,L2,2024-01-01T08:30:00Z,entry\n\
             MH12XY0001|v2,L2,2024-01-01T10:10:00Z,exit\n",
        );

        let mut sync_output = Vec::new();
        create_strategy(StrategyType::Sync, None)
            .process(lots.path(), scans.path(), &mut sync_output)
            .unwrap();

        let mut async_output = Vec::new();
        create_strategy(StrategyType::Async, Some(BatchConfig::new(2, 2)))
            .process(lots.path(), scans.path(), &mut async_output)
            .unwrap();

        assert_eq!(
            String::from_utf8(sync_output).unwrap(),
            String::from_utf8(async_output).unwrap()
        );
    }
}
