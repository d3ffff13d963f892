//! Asynchronous CSV reader with batch interface
//!
//! Reads scan events from a CSV stream in batches for the concurrent
//! processing strategy.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - the csv_format module for row conversion
//!
//! Sequence numbers follow the same rule as `SyncReader`: one per data row,
//! bad rows included.

use crate::io::csv_format::{convert_scan_record, CsvScanRecord};
use crate::types::{ScanEvent, TransactionId};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    row: TransactionId,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader, row: 0 }
    }

    /// Read a batch of scan events
    ///
    /// Collects up to `batch_size` events. Rows that fail to parse are logged
    /// and skipped without counting towards the batch.
    ///
    /// # Returns
    ///
    /// The converted events; an empty vector only once the end of the input
    /// is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<ScanEvent> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvScanRecord>();

        while batch.len() < batch_size {
            let Some(row) = records.next().await else {
                break;
            };
            self.row += 1;

            let line = self.row + 1;
            match row {
                Ok(record) => match convert_scan_record(record, self.row) {
                    Ok(event) => batch.push(event),
                    Err(e) => warn!(line, error = %e, "skipping scan row"),
                },
                Err(e) => warn!(line, error = %e, "CSV parse error"),
            }
        }

        batch
    }
}
