//! Scan and transaction types
//!
//! This module defines the input of the engine (`ScanEvent`) and its output
//! (`ParkingTransaction`). Every processed scan event produces exactly one
//! transaction, successful or not.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

use super::error::ParkingError;
use super::lot::LotId;
use super::session::ParkingSession;
use super::vehicle::VehicleId;

/// Transaction identifier
///
/// Equal to the sequence number of the scan event that produced it, which
/// makes replays of the same scan detectable.
pub type TransactionId = u64;

/// Which side of a session a scan resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// The vehicle drove in; a session was opened
    Entry,

    /// The vehicle drove out; its session was closed and charged
    Exit,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanKind::Entry => f.write_str("entry"),
            ScanKind::Exit => f.write_str("exit"),
        }
    }
}

/// How the operator wants a scan to be interpreted
///
/// Gate terminals usually run in `Auto` mode, where the open-session state
/// decides. Dedicated entry or exit lanes pin the direction, so a scan that
/// contradicts the lot state is rejected instead of silently flipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanDirection {
    #[default]
    Auto,
    Entry,
    Exit,
}

/// Outcome of a processed scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Success => f.write_str("Success"),
            TransactionStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// One decode of a QR payload plus the lot it was read at
///
/// Not persisted; it lives for the duration of one processing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    /// Identity of the physical scan; becomes the transaction id
    pub sequence: TransactionId,

    /// Text exactly as the decoder produced it
    pub raw_payload: String,
    pub lot_id: LotId,
    pub timestamp: DateTime<Utc>,
    pub direction: ScanDirection,
}

/// Recorded outcome of processing one scan event
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingTransaction {
    pub id: TransactionId,
    pub timestamp: DateTime<Utc>,

    /// Uppercased plate, or the raw payload when it could not be decoded
    pub vehicle_number: String,
    pub vehicle_id: Option<VehicleId>,
    pub lot_id: LotId,

    /// `None` when the scan failed before entry/exit could be decided
    pub kind: Option<ScanKind>,
    pub status: TransactionStatus,
    pub charge_amount: Decimal,

    /// Why the scan failed; `None` on success
    pub reason: Option<ParkingError>,
}

impl ParkingTransaction {
    /// Successful entry: the session was just opened, nothing is charged
    pub fn entry(id: TransactionId, session: &ParkingSession, currency_scale: u32) -> Self {
        let mut charge = Decimal::ZERO;
        charge.rescale(currency_scale);

        ParkingTransaction {
            id,
            timestamp: session.entry_timestamp,
            vehicle_number: session.vehicle_number.clone(),
            vehicle_id: Some(session.vehicle_id.clone()),
            lot_id: session.lot_id.clone(),
            kind: Some(ScanKind::Entry),
            status: TransactionStatus::Success,
            charge_amount: charge,
            reason: None,
        }
    }

    /// Successful exit of a closed session
    pub fn exit(
        id: TransactionId,
        session: &ParkingSession,
        timestamp: DateTime<Utc>,
        charge: Decimal,
    ) -> Self {
        ParkingTransaction {
            id,
            timestamp,
            vehicle_number: session.vehicle_number.clone(),
            vehicle_id: Some(session.vehicle_id.clone()),
            lot_id: session.lot_id.clone(),
            kind: Some(ScanKind::Exit),
            status: TransactionStatus::Success,
            charge_amount: charge,
            reason: None,
        }
    }

    /// Failed scan carrying the error that rejected it
    pub fn failed(
        id: TransactionId,
        timestamp: DateTime<Utc>,
        vehicle_number: impl Into<String>,
        vehicle_id: Option<VehicleId>,
        lot_id: impl Into<LotId>,
        kind: Option<ScanKind>,
        reason: ParkingError,
    ) -> Self {
        ParkingTransaction {
            id,
            timestamp,
            vehicle_number: vehicle_number.into(),
            vehicle_id,
            lot_id: lot_id.into(),
            kind,
            status: TransactionStatus::Failed,
            charge_amount: Decimal::ZERO,
            reason: Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }

    /// Whether this records a scan of `vehicle_id` at `lot_id` taken at `at`
    ///
    /// `None` matches transactions of payloads that could not be decoded.
    pub fn is_scan_of(&self, vehicle_id: Option<&str>, lot_id: &str, at: DateTime<Utc>) -> bool {
        self.vehicle_id.as_deref() == vehicle_id && self.lot_id == lot_id && self.timestamp == at
    }
}
