//! Synchronous processing strategy
//!
//! Single-threaded implementation of the ProcessingStrategy trait. It
//! coordinates the SyncReader (CSV input) and the TransactionEngine
//! (session logic), delegating:
//! - lot loading to `csv_format::read_lots`
//! - scan parsing to `SyncReader` (iterator interface)
//! - scan processing to `TransactionEngine`
//! - CSV output to `csv_format::write_transactions_csv`
//!
//! Scans are streamed one row at a time. Memory grows with the number of
//! recorded transactions and open sessions, not with the raw input.

use crate::core::TransactionEngine;
use crate::io::csv_format::{read_lots, write_transactions_csv};
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::ParkingTransaction;
use std::io::Write;
use std::path::Path;
use tracing::{error, info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use parking_session_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy;
/// let mut output = io::stdout();
///
/// strategy
///     .process(Path::new("lots.csv"), Path::new("scans.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        lots_path: &Path,
        scans_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let lots = read_lots(lots_path).map_err(|e| e.to_string())?;
        info!(lots = lots.len(), "loaded parking lots");

        let reader = SyncReader::new(scans_path).map_err(|e| e.to_string())?;
        let mut engine = TransactionEngine::new(lots);

        for result in reader {
            let outcome = result.and_then(|event| engine.process_event(&event).map(|_| ()));
            match outcome {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => warn!(error = %e, "skipping scan"),
                Err(e) => {
                    error!(error = %e, "scan processing aborted");
                    return Err(e.to_string());
                }
            }
        }

        let transactions: Vec<ParkingTransaction> =
            engine.ledger().transactions().into_iter().cloned().collect();
        info!(
            transactions = transactions.len(),
            open_sessions = engine.tracker().open_sessions().len(),
            "scan processing finished"
        );

        write_transactions_csv(&transactions, output).map_err(|e| e.to_string())
    }
}
