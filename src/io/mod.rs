//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row conversion, lot loading, output)
//! - `sync_reader` - Synchronous scan reader with iterator interface
//! - `async_reader` - Asynchronous scan reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_lot_record, convert_scan_record, read_lots, write_transactions_csv, CsvLotRecord,
    CsvScanRecord,
};
pub use sync_reader::SyncReader;
