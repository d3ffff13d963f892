//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `vehicle`: Vehicle identity
//! - `lot`: Parking lots and rate policies
//! - `session`: Parking sessions and their keys
//! - `transaction`: Scan events and transaction records
//! - `error`: Error types for the parking engine

pub mod error;
pub mod lot;
pub mod session;
pub mod transaction;
pub mod vehicle;

pub use error::ParkingError;
pub use lot::{LotId, ParkingLot, RatePolicy};
pub use session::{ParkingSession, SessionId, SessionKey};
pub use transaction::{
    ParkingTransaction, ScanDirection, ScanEvent, ScanKind, TransactionId, TransactionStatus,
};
pub use vehicle::{Vehicle, VehicleId};
