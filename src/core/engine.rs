//! Transaction processing engine
//!
//! This module provides the TransactionEngine that turns scans into parking
//! transactions by coordinating the lot lookup, the SessionTracker and the
//! transaction ledger.
//!
//! The engine enforces business rules such as:
//! - Unknown lots are rejected before any session is touched
//! - An open session turns a scan into an exit, otherwise it is an entry
//! - Exits are charged from the lot's rate policy
//! - Each scan event is processed at most once; a sequence reused by a
//!   different scan is refused with `SequenceConflict`
//!
//! Every domain failure is recorded as a `Failed` transaction, so the caller
//! always gets something it can show to the gate operator. Only a failing
//! ledger (`ParkingError::Unavailable`) is returned as an error, and the
//! session transition it interrupted is reverted first.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::core::charge::compute_charge;
use crate::core::ledger::MemoryLedger;
use crate::core::lot_registry::LotRegistry;
use crate::core::payload_codec;
use crate::core::session_tracker::SessionTracker;
use crate::core::traits::{LotLookup, TransactionLedger};
use crate::types::{
    ParkingError, ParkingLot, ParkingSession, ParkingTransaction, ScanDirection, ScanEvent,
    ScanKind, SessionKey, TransactionId, Vehicle,
};

/// Transaction processing engine
///
/// Generic over its lot-lookup and persistence collaborators; the defaults
/// keep everything in memory.
pub struct TransactionEngine<K: LotLookup = LotRegistry, L: TransactionLedger = MemoryLedger> {
    lots: K,
    tracker: SessionTracker,
    ledger: L,

    /// Id handed to the next scan that arrives without a sequence number
    next_sequence: TransactionId,
}

impl TransactionEngine {
    /// Create an engine over a lot registry with an in-memory ledger
    pub fn new(lots: LotRegistry) -> Self {
        TransactionEngine::with_collaborators(lots, MemoryLedger::new())
    }
}

impl<K: LotLookup, L: TransactionLedger> TransactionEngine<K, L> {
    /// Create an engine over the given collaborators
    pub fn with_collaborators(lots: K, ledger: L) -> Self {
        TransactionEngine {
            lots,
            tracker: SessionTracker::new(),
            ledger,
            next_sequence: 1,
        }
    }

    /// Process a decoded scan
    ///
    /// Decides entry or exit from the open-session state of the vehicle in
    /// the lot. The scan gets the next transaction id not yet recorded.
    ///
    /// # Arguments
    ///
    /// * `vehicle` - Decoded payload; the plate is uppercased here
    /// * `lot_id` - Lot the scan was made at
    /// * `now` - Scan timestamp
    ///
    /// # Returns
    ///
    /// * `Ok(ParkingTransaction)` - Successful or failed, but always recorded
    /// * `Err(ParkingError::Unavailable)` - The ledger could not record it
    pub fn process_scan(
        &mut self,
        vehicle: &Vehicle,
        lot_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ParkingTransaction, ParkingError> {
        let id = self.allocate_sequence()?;
        self.resolve(id, &vehicle.normalized(), lot_id, now, ScanDirection::Auto)
    }

    /// Process a plate typed in by the gate operator
    ///
    /// Used when the pass cannot be read. The session is keyed on the
    /// trimmed, uppercased plate, which stands in for the vehicle id. An
    /// empty plate is recorded as a failed scan.
    pub fn process_plate(
        &mut self,
        vehicle_number: &str,
        lot_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ParkingTransaction, ParkingError> {
        let id = self.allocate_sequence()?;
        match Vehicle::from_plate(vehicle_number) {
            Some(vehicle) => self.resolve(id, &vehicle, lot_id, now, ScanDirection::Auto),
            None => self.reject(ParkingTransaction::failed(
                id,
                now,
                vehicle_number,
                None,
                lot_id,
                None,
                ParkingError::invalid_input("vehicle number is empty"),
            )),
        }
    }

    /// Process payload text straight from a decoder
    ///
    /// Wraps the text into an `Auto` scan event with the next free sequence.
    pub fn process_payload(
        &mut self,
        raw_payload: &str,
        lot_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ParkingTransaction, ParkingError> {
        let event = ScanEvent {
            sequence: self.allocate_sequence()?,
            raw_payload: raw_payload.to_string(),
            lot_id: lot_id.to_string(),
            timestamp: now,
            direction: ScanDirection::Auto,
        };
        self.process_event(&event)
    }

    /// Process a raw scan event
    ///
    /// Decodes the payload, honours the event direction, and uses the event
    /// sequence as transaction id. A replay of an already recorded event is
    /// not processed again; the recorded transaction is returned instead.
    ///
    /// # Returns
    ///
    /// * `Ok(ParkingTransaction)` - Successful or failed, but always recorded
    /// * `Err(ParkingError::SequenceConflict)` - The sequence is recorded for a
    ///   different scan
    /// * `Err(ParkingError::Unavailable)` - The ledger could not be read or written
    pub fn process_event(&mut self, event: &ScanEvent) -> Result<ParkingTransaction, ParkingError> {
        self.next_sequence = self.next_sequence.max(event.sequence + 1);

        if let Some(recorded) = self.ledger.find(event.sequence)? {
            return replayed(recorded, event);
        }

        match payload_codec::decode(&event.raw_payload) {
            Ok(vehicle) => self.resolve(
                event.sequence,
                &vehicle.normalized(),
                &event.lot_id,
                event.timestamp,
                event.direction,
            ),
            Err(error) => self.reject(
                ParkingTransaction::failed(
                    event.sequence,
                    event.timestamp,
                    event.raw_payload.clone(),
                    None,
                    event.lot_id.clone(),
                    None,
                    error,
                ),
            ),
        }
    }

    fn resolve(
        &mut self,
        id: TransactionId,
        vehicle: &Vehicle,
        lot_id: &str,
        now: DateTime<Utc>,
        direction: ScanDirection,
    ) -> Result<ParkingTransaction, ParkingError> {
        let Some(lot) = self.lots.get_lot(lot_id) else {
            return self.reject(ParkingTransaction::failed(
                id,
                now,
                vehicle.vehicle_number.clone(),
                Some(vehicle.vehicle_id.clone()),
                lot_id,
                None,
                ParkingError::unknown_lot(lot_id),
            ));
        };

        let key = SessionKey::new(vehicle.vehicle_id.clone(), lot_id);
        let open = self.tracker.find_open_session(&key).cloned();
        debug!(tx = id, key = %key, open = open.is_some(), ?direction, "resolving scan");

        match (direction, open) {
            (ScanDirection::Auto | ScanDirection::Exit, Some(session)) => {
                self.process_exit(id, &lot, session, now)
            }
            (ScanDirection::Exit, None) => self.reject(ParkingTransaction::failed(
                id,
                now,
                vehicle.vehicle_number.clone(),
                Some(vehicle.vehicle_id.clone()),
                lot_id,
                Some(ScanKind::Exit),
                ParkingError::no_open_session(&vehicle.vehicle_id, lot_id),
            )),
            (ScanDirection::Auto | ScanDirection::Entry, _) => {
                self.process_entry(id, &lot, vehicle, now)
            }
        }
    }

    /// Open a session; an existing open session rejects the entry
    fn process_entry(
        &mut self,
        id: TransactionId,
        lot: &ParkingLot,
        vehicle: &Vehicle,
        now: DateTime<Utc>,
    ) -> Result<ParkingTransaction, ParkingError> {
        let session = match self.tracker.open_session(vehicle, &lot.lot_id, now) {
            Ok(session) => session,
            Err(error) => {
                return self.reject(ParkingTransaction::failed(
                    id,
                    now,
                    vehicle.vehicle_number.clone(),
                    Some(vehicle.vehicle_id.clone()),
                    lot.lot_id.clone(),
                    Some(ScanKind::Entry),
                    error,
                ))
            }
        };

        let transaction = ParkingTransaction::entry(id, &session, lot.rate.currency_scale);
        if let Err(error) = self.ledger.record(&transaction) {
            self.tracker.revert_open(&session);
            return Err(error);
        }

        info!(
            tx = id,
            session = session.id,
            vehicle = %session.vehicle_number,
            lot = %session.lot_id,
            "vehicle entered"
        );
        Ok(transaction)
    }

    /// Charge and close an open session
    fn process_exit(
        &mut self,
        id: TransactionId,
        lot: &ParkingLot,
        session: ParkingSession,
        now: DateTime<Utc>,
    ) -> Result<ParkingTransaction, ParkingError> {
        let closed = compute_charge(&lot.rate, session.entry_timestamp, now).and_then(|charge| {
            self.tracker
                .close_session(&session, now)
                .map(|closed| (closed, charge))
        });

        let (closed, charge) = match closed {
            Ok(result) => result,
            Err(error) => {
                return self.reject(ParkingTransaction::failed(
                    id,
                    now,
                    session.vehicle_number.clone(),
                    Some(session.vehicle_id.clone()),
                    lot.lot_id.clone(),
                    Some(ScanKind::Exit),
                    error,
                ))
            }
        };

        let transaction = ParkingTransaction::exit(id, &closed, now, charge);
        if let Err(error) = self.ledger.commit_exit(&closed, &transaction) {
            self.tracker.revert_close(&closed);
            return Err(error);
        }

        info!(
            tx = id,
            session = closed.id,
            vehicle = %closed.vehicle_number,
            lot = %closed.lot_id,
            charge = %charge,
            "vehicle exited"
        );
        Ok(transaction)
    }

    /// Record a failed scan, charged zero in the lot's currency scale
    fn reject(
        &mut self,
        mut transaction: ParkingTransaction,
    ) -> Result<ParkingTransaction, ParkingError> {
        if let Some(lot) = self.lots.get_lot(&transaction.lot_id) {
            transaction.charge_amount.rescale(lot.rate.currency_scale);
        }
        self.ledger.record(&transaction)?;

        if let Some(reason) = &transaction.reason {
            warn!(
                tx = transaction.id,
                vehicle = %transaction.vehicle_number,
                lot = %transaction.lot_id,
                %reason,
                "scan rejected"
            );
        }
        Ok(transaction)
    }

    /// Next sequence for a scan that arrives without one
    ///
    /// Skips ids the ledger already holds, so a self-numbered scan never
    /// takes over the id of a recorded event.
    fn allocate_sequence(&mut self) -> Result<TransactionId, ParkingError> {
        while self.ledger.find(self.next_sequence)?.is_some() {
            self.next_sequence += 1;
        }
        let id = self.next_sequence;
        self.next_sequence += 1;
        Ok(id)
    }

    /// The session tracker, for inspecting open sessions
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// The persistence collaborator
    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}

/// Whether `recorded` is the outcome of `event`: same lot, time and vehicle
fn records_scan(recorded: &ParkingTransaction, event: &ScanEvent) -> bool {
    match payload_codec::decode(&event.raw_payload) {
        Ok(vehicle) => {
            let vehicle_id = Some(vehicle.vehicle_id.as_str());
            recorded.is_scan_of(vehicle_id, &event.lot_id, event.timestamp)
        }
        Err(_) => {
            recorded.is_scan_of(None, &event.lot_id, event.timestamp)
                && recorded.vehicle_number == event.raw_payload
        }
    }
}

/// Outcome for an event whose sequence is already recorded
pub(crate) fn replayed(
    recorded: ParkingTransaction,
    event: &ScanEvent,
) -> Result<ParkingTransaction, ParkingError> {
    if records_scan(&recorded, event) {
        debug!(tx = event.sequence, "scan already processed, returning recorded outcome");
        return Ok(recorded);
    }

    warn!(
        tx = event.sequence,
        payload = %event.raw_payload,
        lot = %event.lot_id,
        "scan sequence already used by a different scan"
    );
    Err(ParkingError::sequence_conflict(event.sequence))
}
