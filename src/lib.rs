//! Parking Session Engine Library
//!
//! # Overview
//!
//! Turns QR scans taken at parking-lot gates into entry and exit
//! transactions. A vehicle's pass carries the payload
//! `vehicleNumber|vehicleId`; the first scan at a lot opens a session, the
//! next one closes it and charges for the time parked.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Vehicle, ParkingLot, ParkingSession, ...)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Session logic:
//!   - [`core::payload_codec`] - QR payload encoding and decoding
//!   - [`core::session_tracker`] - Open sessions per `(vehicle, lot)` pair
//!   - [`core::engine`] - Scan processing and transaction recording
//!   - [`core::scanner`] - Camera-frame driver with duplicate suppression
//!   - `core::async` - Thread-safe tracker and engine for batch runs
//! - [`io`] - CSV input and output
//! - [`strategy`] - Sync and async processing pipelines
//!
//! # Guarantees
//!
//! - At most one open session per vehicle and lot
//! - Each scan sequence is processed at most once; replays return the
//!   recorded transaction
//! - Charges are a pure function of entry time, exit time and rate policy

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{LotRegistry, MemoryLedger, SessionTracker, TransactionEngine};
pub use io::write_transactions_csv;
pub use types::{
    ParkingError, ParkingLot, ParkingSession, ParkingTransaction, RatePolicy, ScanDirection,
    ScanEvent, ScanKind, SessionKey, TransactionStatus, Vehicle,
};
