//! CSV format handling for lots, scans and transaction output
//!
//! This module centralizes all CSV format concerns, providing:
//! - Record structures for deserialization
//! - Conversion from CSV records to domain types
//! - Lot file loading
//! - Transaction output serialization

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::core::LotRegistry;
use crate::types::lot::{DEFAULT_CURRENCY_SCALE, DEFAULT_UNIT_SECONDS};
use crate::types::{
    ParkingError, ParkingLot, ParkingTransaction, RatePolicy, ScanDirection, ScanEvent,
    TransactionId,
};

/// Lot file row: `lot,rate,unit_seconds,currency_scale`
///
/// The last two columns are optional and default to one hour and two
/// fractional digits.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvLotRecord {
    pub lot: String,
    pub rate: String,
    pub unit_seconds: Option<u32>,
    pub currency_scale: Option<u32>,
}

/// Scan file row: `payload,lot,timestamp,direction`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvScanRecord {
    pub payload: String,
    pub lot: String,
    pub timestamp: String,
    pub direction: Option<String>,
}

/// Convert a lot row into a ParkingLot
///
/// # Returns
///
/// * `Ok(ParkingLot)` - Successfully converted lot
/// * `Err(String)` - Description of the conversion failure
pub fn convert_lot_record(record: CsvLotRecord) -> Result<ParkingLot, String> {
    let amount = Decimal::from_str(record.rate.trim())
        .map_err(|_| format!("Invalid rate '{}' for lot '{}'", record.rate, record.lot))?;

    let rate = RatePolicy {
        amount,
        unit_seconds: record.unit_seconds.unwrap_or(DEFAULT_UNIT_SECONDS),
        currency_scale: record.currency_scale.unwrap_or(DEFAULT_CURRENCY_SCALE),
    };
    rate.validate()
        .map_err(|e| format!("Lot '{}': {}", record.lot, e))?;

    Ok(ParkingLot::new(record.lot, rate))
}

/// Convert a scan row into a ScanEvent
///
/// # Arguments
///
/// * `record` - The deserialized row
/// * `sequence` - 1-based data row number; becomes the scan sequence
///
/// # Returns
///
/// * `Ok(ScanEvent)` - Successfully converted scan
/// * `Err(String)` - Description of the conversion failure
pub fn convert_scan_record(
    record: CsvScanRecord,
    sequence: TransactionId,
) -> Result<ScanEvent, String> {
    let timestamp = DateTime::parse_from_rfc3339(record.timestamp.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            format!(
                "Invalid timestamp '{}' for scan {}: {}",
                record.timestamp, sequence, e
            )
        })?;

    let direction = match record.direction.as_deref().map(str::trim) {
        None | Some("") => ScanDirection::Auto,
        Some(value) => match value.to_lowercase().as_str() {
            "auto" => ScanDirection::Auto,
            "entry" => ScanDirection::Entry,
            "exit" => ScanDirection::Exit,
            _ => {
                return Err(format!(
                    "Invalid direction '{}' for scan {}",
                    value, sequence
                ))
            }
        },
    };

    Ok(ScanEvent {
        sequence,
        raw_payload: record.payload,
        lot_id: record.lot,
        timestamp,
        direction,
    })
}

/// Load the lot registry from a CSV file
///
/// Rows that do not parse, carry an invalid rate or repeat a lot id are
/// skipped with a warning.
///
/// # Errors
///
/// Returns `FileNotFound` or `IoError` if the file cannot be opened or
/// read.
pub fn read_lots(path: &Path) -> Result<LotRegistry, ParkingError> {
    let file = File::open(path).map_err(|e| ParkingError::open_failed(path, e))?;
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut registry = LotRegistry::new();
    for (index, row) in reader.deserialize::<CsvLotRecord>().enumerate() {
        let line = index as u64 + 2;
        let lot = row
            .map_err(ParkingError::from)
            .and_then(|record| {
                convert_lot_record(record).map_err(|message| ParkingError::ParseError {
                    line: Some(line),
                    message,
                })
            })
            .and_then(|lot| registry.insert(lot));

        match lot {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => warn!(line, error = %e, "skipping lot row"),
            Err(e) => return Err(e),
        }
    }

    Ok(registry)
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Write transactions to CSV format
///
/// Columns: `id,timestamp,lot,vehicle_number,vehicle_id,kind,status,charge,reason`.
/// Transactions are sorted by id for deterministic output.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(ParkingError::IoError)` if a write error occurred
pub fn write_transactions_csv(
    transactions: &[ParkingTransaction],
    output: &mut dyn Write,
) -> Result<(), ParkingError> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "id",
            "timestamp",
            "lot",
            "vehicle_number",
            "vehicle_id",
            "kind",
            "status",
            "charge",
            "reason",
        ])?;

    let mut sorted = transactions.to_vec();
    sorted.sort_by_key(|tx| tx.id);

    for tx in sorted {
        writer
            .write_record(&[
                tx.id.to_string(),
                format_timestamp(&tx.timestamp),
                tx.lot_id.clone(),
                tx.vehicle_number.clone(),
                tx.vehicle_id.clone().unwrap_or_default(),
                tx.kind.map(|kind| kind.to_string()).unwrap_or_default(),
                tx.status.to_string(),
                tx.charge_amount.to_string(),
                tx.reason.as_ref().map(ToString::to_string).unwrap_or_default(),
            ])?;
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::LotLookup;
    use crate::types::{ParkingSession, Vehicle};
    use rstest::rstest;
    use tempfile::NamedTempFile;

    fn scan_record(timestamp: &str, direction: Option<&str>) -> CsvScanRecord {
        CsvScanRecord {
            payload: "KA01AB1234|v1".to_string(),
            lot: "L1".to_string(),
            timestamp: timestamp.to_string(),
            direction: direction.map(|s| s.to_string()),
        }
    }

    #[rstest]
    #[case::missing(None, ScanDirection::Auto)]
    #[case::empty(Some(""), ScanDirection::Auto)]
    #[case::auto(Some("auto"), ScanDirection::Auto)]
    #[case::entry(Some("entry"), ScanDirection::Entry)]
    #[case::exit_uppercase(Some("EXIT"), ScanDirection::Exit)]
    fn test_convert_scan_record_direction(
        #[case] direction: Option<&str>,
        #[case] expected: ScanDirection,
    ) {
        let event = convert_scan_record(scan_record("2024-01-01T08:00:00Z", direction), 3).unwrap();

        assert_eq!(event.direction, expected);
        assert_eq!(event.sequence, 3);
        assert_eq!(event.raw_payload, "KA01AB1234|v1");
    }

    #[test]
    fn test_convert_scan_record_normalizes_offset() {
        let event = convert_scan_record(scan_record("2024-01-01T10:00:00+02:00", None), 1).unwrap();
        assert_eq!(format_timestamp(&event.timestamp), "2024-01-01T08:00:00Z");
    }

    #[rstest]
    #[case::bad_timestamp("yesterday", None)]
    #[case::bad_direction("2024-01-01T08:00:00Z", Some("sideways"))]
    fn test_convert_scan_record_invalid(#[case] timestamp: &str, #[case] direction: Option<&str>) {
        assert!(convert_scan_record(scan_record(timestamp, direction), 1).is_err());
    }

    #[rstest]
    #[case::defaults("10.00", None, None, 3600, 2)]
    #[case::custom("1.5", Some(60), Some(3), 60, 3)]
    fn test_convert_lot_record(
        #[case] rate: &str,
        #[case] unit_seconds: Option<u32>,
        #[case] currency_scale: Option<u32>,
        #[case] expected_unit: u32,
        #[case] expected_scale: u32,
    ) {
        let lot = convert_lot_record(CsvLotRecord {
            lot: "L1".to_string(),
            rate: rate.to_string(),
            unit_seconds,
            currency_scale,
        })
        .unwrap();

        assert_eq!(lot.rate.amount, Decimal::from_str(rate).unwrap());
        assert_eq!(lot.rate.unit_seconds, expected_unit);
        assert_eq!(lot.rate.currency_scale, expected_scale);
    }

    #[rstest]
    #[case::not_a_number("ten", None)]
    #[case::negative("-1", None)]
    #[case::zero_unit("10", Some(0))]
    fn test_convert_lot_record_invalid(#[case] rate: &str, #[case] unit_seconds: Option<u32>) {
        let result = convert_lot_record(CsvLotRecord {
            lot: "L1".to_string(),
            rate: rate.to_string(),
            unit_seconds,
            currency_scale: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_read_lots_skips_bad_rows() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "lot,rate,unit_seconds,currency_scale\nL1,10.00\nL2,abc\nL3,2.50,1800,2\nL1,99\n"
        )
        .unwrap();
        file.flush().unwrap();

        let registry = read_lots(file.path()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get_lot("L1").unwrap().rate.amount, Decimal::new(1000, 2));
        assert_eq!(registry.get_lot("L3").unwrap().rate.unit_seconds, 1800);
    }

    #[test]
    fn test_read_lots_missing_file() {
        let result = read_lots(Path::new("no_such_lots.csv"));
        assert_eq!(
            result.unwrap_err(),
            ParkingError::FileNotFound {
                path: "no_such_lots.csv".to_string()
            }
        );
    }

    #[test]
    fn test_write_transactions_csv_sorted() {
        let ts = DateTime::parse_from_rfc3339("2024-01-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let failed = ParkingTransaction::failed(
            2,
            ts,
            "ABC123",
            None,
            "L1",
            None,
            ParkingError::malformed_payload("ABC123"),
        );
        let session = ParkingSession::open(4, &Vehicle::new("KA01AB1234", "v1"), "L1", ts);
        let success = ParkingTransaction::exit(1, &session, ts, Decimal::new(1000, 2));

        let mut output = Vec::new();
        write_transactions_csv(&[failed, success], &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "id,timestamp,lot,vehicle_number,vehicle_id,kind,status,charge,reason",
                "1,2024-01-01T08:00:00Z,L1,KA01AB1234,v1,exit,Success,10.00,",
                "2,2024-01-01T08:00:00Z,L1,ABC123,,,Failed,0,Malformed payload 'ABC123': expected '<vehicleNumber>|<vehicleId>'",
            ]
        );
    }

    struct ClosedOutput;

    impl std::io::Write for ClosedOutput {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_write_transactions_csv_reports_io_error() {
        let result = write_transactions_csv(&[], &mut ClosedOutput);

        assert!(matches!(result, Err(ParkingError::IoError { .. })));
    }
}
