//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over scan events from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Sequence Numbers
//!
//! Every data row consumes one sequence number, including rows that fail to
//! parse. Sequence numbers therefore equal the 1-based data row number and
//! are identical whichever reader processes the file.
//!
//! ```no_run
//! use parking_session_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("scans.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(event) => println!("Scan {}: {}", event.sequence, event.raw_payload),
//!         Err(e) => eprintln!("Skipped: {}", e),
//!     }
//! }
//! ```

use crate::io::csv_format::{convert_scan_record, CsvScanRecord};
use crate::types::{ParkingError, ScanEvent, TransactionId};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Streams one row at a time; memory use does not grow with the file.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    row: TransactionId,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (for the optional direction field)
    /// - Use an 8KB buffer for efficient I/O
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(ParkingError::FileNotFound | ParkingError::IoError)` otherwise
    pub fn new(path: &Path) -> Result<Self, ParkingError> {
        let file = File::open(path).map_err(|e| ParkingError::open_failed(path, e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self { reader, row: 0 })
    }
}

impl Iterator for SyncReader {
    type Item = Result<ScanEvent, ParkingError>;

    /// Get the next scan event from the CSV file
    ///
    /// # Returns
    ///
    /// * `Some(Ok(ScanEvent))` - Successfully parsed row
    /// * `Some(Err(ParkingError::ParseError))` - Bad row; reading may go on
    /// * `Some(Err(ParkingError::IoError))` - The file could not be read
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvScanRecord>();
        let row = deserializer.next()?;
        self.row += 1;

        // Header is line 1, so data row N sits on line N + 1
        let line = self.row + 1;
        Some(match row {
            Ok(record) => convert_scan_record(record, self.row).map_err(|message| {
                ParkingError::ParseError {
                    line: Some(line),
                    message,
                }
            }),
            Err(e) => Err(e.into()),
        })
    }
}
