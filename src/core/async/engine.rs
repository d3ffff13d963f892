//! Scan processing orchestration for concurrent gates
//!
//! This module provides the `AsyncTransactionEngine` struct, which applies
//! the same entry/exit rules as the single-threaded engine on top of the
//! thread-safe `AsyncSessionTracker` and a `SharedLedger`.
//!
//! # Architecture
//!
//! ```text
//! AsyncTransactionEngine
//!     ├── Arc<dyn LotLookup>         (read-only lot registry)
//!     ├── Arc<AsyncSessionTracker>   (per-pair locked session state)
//!     └── Arc<dyn SharedLedger>      (thread-safe transaction history)
//! ```
//!
//! # Thread Safety
//!
//! The decision, the ledger writes and the session transition of one scan
//! all run inside `AsyncSessionTracker::update`, so scans of the same
//! `(vehicle, lot)` pair are serialized while other pairs proceed in
//! parallel.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AsyncSessionTracker;
use crate::core::charge::compute_charge;
use crate::core::engine::replayed;
use crate::core::payload_codec;
use crate::core::session_slot::SessionSlot;
use crate::core::traits::{LotLookup, SharedLedger};
use crate::types::{
    ParkingError, ParkingLot, ParkingSession, ParkingTransaction, ScanDirection, ScanEvent,
    ScanKind, SessionKey, TransactionId, Vehicle,
};

/// Thread-safe scan processor
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct AsyncTransactionEngine {
    lots: Arc<dyn LotLookup + Send + Sync>,
    tracker: Arc<AsyncSessionTracker>,
    ledger: Arc<dyn SharedLedger>,
    next_sequence: AtomicU64,
}

impl AsyncTransactionEngine {
    /// Create a new AsyncTransactionEngine
    ///
    /// # Arguments
    ///
    /// * `lots` - Lot-lookup collaborator
    /// * `tracker` - Arc-wrapped AsyncSessionTracker owning open sessions
    /// * `ledger` - Persistence collaborator
    pub fn new(
        lots: Arc<dyn LotLookup + Send + Sync>,
        tracker: Arc<AsyncSessionTracker>,
        ledger: Arc<dyn SharedLedger>,
    ) -> Self {
        Self {
            lots,
            tracker,
            ledger,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Process a decoded scan in `Auto` direction
    ///
    /// # Returns
    ///
    /// * `Ok(ParkingTransaction)` - Successful or failed, but always recorded
    /// * `Err(ParkingError::Unavailable)` - The ledger could not record it
    pub fn process_scan(
        &self,
        vehicle: &Vehicle,
        lot_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ParkingTransaction, ParkingError> {
        let id = self.allocate_sequence()?;
        self.resolve(id, &vehicle.normalized(), lot_id, now, ScanDirection::Auto)
    }

    /// Process a plate typed in by the gate operator
    ///
    /// Same contract as `TransactionEngine::process_plate`.
    pub fn process_plate(
        &self,
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

    /// Process a raw scan event
    ///
    /// Same contract as `TransactionEngine::process_event`: the sequence
    /// becomes the transaction id and a replayed sequence returns the
    /// recorded outcome, while a sequence held by a different scan is refused
    /// with `SequenceConflict`.
    pub fn process_event(&self, event: &ScanEvent) -> Result<ParkingTransaction, ParkingError> {
        self.next_sequence
            .fetch_max(event.sequence + 1, Ordering::SeqCst);

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
            Err(error) => self.reject(ParkingTransaction::failed(
                event.sequence,
                event.timestamp,
                event.raw_payload.clone(),
                None,
                event.lot_id.clone(),
                None,
                error,
            )),
        }
    }

    fn resolve(
        &self,
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
        self.tracker.update(&key, |slot| {
            // Another scan holding this id may have won the race
            if let Some(recorded) = self.ledger.find(id)? {
                if recorded.is_scan_of(Some(vehicle.vehicle_id.as_str()), lot_id, now) {
                    return Ok(recorded);
                }
                return Err(ParkingError::sequence_conflict(id));
            }

            let open = slot.open_session().cloned();
            debug!(tx = id, key = %key, open = open.is_some(), ?direction, "resolving scan");

            match (direction, open) {
                (ScanDirection::Auto | ScanDirection::Exit, Some(session)) => {
                    self.process_exit(slot, id, &lot, session, now)
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
                    self.process_entry(slot, id, &lot, vehicle, now)
                }
            }
        })
    }

    fn process_entry(
        &self,
        slot: &mut SessionSlot,
        id: TransactionId,
        lot: &ParkingLot,
        vehicle: &Vehicle,
        now: DateTime<Utc>,
    ) -> Result<ParkingTransaction, ParkingError> {
        let session = match slot.open(self.tracker.allocate_id(), vehicle, &lot.lot_id, now) {
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
            slot.revert_open(&session);
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

    fn process_exit(
        &self,
        slot: &mut SessionSlot,
        id: TransactionId,
        lot: &ParkingLot,
        session: ParkingSession,
        now: DateTime<Utc>,
    ) -> Result<ParkingTransaction, ParkingError> {
        let closed = compute_charge(&lot.rate, session.entry_timestamp, now)
            .and_then(|charge| slot.close(&session, now).map(|closed| (closed, charge)));

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
            slot.revert_close(&closed);
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

    fn reject(
        &self,
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

    /// Next id not yet held by the ledger
    fn allocate_sequence(&self) -> Result<TransactionId, ParkingError> {
        loop {
            let id = self.next_sequence.fetch_add(1, Ordering::SeqCst);
            if self.ledger.find(id)?.is_none() {
                return Ok(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::r#async::AsyncLedger;
    use crate::core::LotRegistry;
    use crate::types::{RatePolicy, SessionId, TransactionStatus};
    use rust_decimal::Decimal;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn engine() -> (AsyncTransactionEngine, Arc<AsyncSessionTracker>, Arc<AsyncLedger>) {
        let lots = LotRegistry::from_lots([ParkingLot::new(
            "L1",
            RatePolicy::per_hour(Decimal::new(10, 0)),
        )])
        .unwrap();
        let tracker = Arc::new(AsyncSessionTracker::new());
        let ledger = Arc::new(AsyncLedger::new());
        let engine =
            AsyncTransactionEngine::new(Arc::new(lots), Arc::clone(&tracker), ledger.clone());
        (engine, tracker, ledger)
    }

    fn event(sequence: u64, payload: &str, lot: &str, secs: i64) -> ScanEvent {
        ScanEvent {
            sequence,
            raw_payload: payload.to_string(),
            lot_id: lot.to_string(),
            timestamp: at(secs),
            direction: ScanDirection::Auto,
        }
    }

    struct OfflineLedger;

    impl SharedLedger for OfflineLedger {
        fn find(&self, _id: TransactionId) -> Result<Option<ParkingTransaction>, ParkingError> {
            Ok(None)
        }

        fn record(&self, _transaction: &ParkingTransaction) -> Result<(), ParkingError> {
            Err(ParkingError::unavailable("offline"))
        }

        fn archive(&self, _session: &ParkingSession) -> Result<(), ParkingError> {
            Err(ParkingError::unavailable("offline"))
        }

        fn unarchive(&self, _session_id: SessionId) -> Result<(), ParkingError> {
            Err(ParkingError::unavailable("offline"))
        }
    }

    /// Archives sessions but refuses transaction records while switched on
    #[derive(Default)]
    struct RecordRefusingLedger {
        inner: AsyncLedger,
        refuse_records: AtomicBool,
    }

    impl SharedLedger for RecordRefusingLedger {
        fn find(&self, id: TransactionId) -> Result<Option<ParkingTransaction>, ParkingError> {
            self.inner.find(id)
        }

        fn record(&self, transaction: &ParkingTransaction) -> Result<(), ParkingError> {
            if self.refuse_records.load(Ordering::SeqCst) {
                return Err(ParkingError::unavailable("store offline"));
            }
            self.inner.record(transaction)
        }

        fn archive(&self, session: &ParkingSession) -> Result<(), ParkingError> {
            self.inner.archive(session)
        }

        fn unarchive(&self, session_id: SessionId) -> Result<(), ParkingError> {
            self.inner.unarchive(session_id)
        }
    }

    #[test]
    fn test_entry_then_exit() {
        let (engine, tracker, ledger) = engine();
        let vehicle = Vehicle::new("KA01AB1234", "v1");

        let entry = engine.process_scan(&vehicle, "L1", at(0)).unwrap();
        assert_eq!(entry.kind, Some(ScanKind::Entry));
        assert_eq!(tracker.open_sessions().len(), 1);

        let exit = engine.process_scan(&vehicle, "L1", at(3600)).unwrap();
        assert_eq!(exit.kind, Some(ScanKind::Exit));
        assert_eq!(exit.charge_amount.to_string(), "10.00");
        assert!(tracker.open_sessions().is_empty());
        assert_eq!(ledger.archived_sessions().len(), 1);
        assert_eq!(ledger.transactions().len(), 2);
    }

    #[test]
    fn test_unknown_lot_and_malformed_payload() {
        let (engine, tracker, _ledger) = engine();

        let unknown = engine.process_event(&event(1, "KA01AB1234|v1", "L_missing", 0)).unwrap();
        let malformed = engine.process_event(&event(2, "A|B|C", "L1", 0)).unwrap();

        assert_eq!(unknown.reason, Some(ParkingError::unknown_lot("L_missing")));
        assert_eq!(malformed.reason, Some(ParkingError::malformed_payload("A|B|C")));
        assert!(tracker.open_sessions().is_empty());
    }

    #[test]
    fn test_concurrent_duplicate_entries_open_one_session() {
        let (engine, tracker, ledger) = engine();
        let engine = Arc::new(engine);

        let handles: Vec<_> = (1..=8u64)
            .map(|sequence| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let mut scan = event(sequence, "KA01AB1234|v1", "L1", 0);
                    scan.direction = ScanDirection::Entry;
                    engine.process_event(&scan).unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let succeeded = results.iter().filter(|tx| tx.is_success()).count();

        assert_eq!(succeeded, 1);
        assert!(results
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Failed)
            .all(|tx| matches!(tx.reason, Some(ParkingError::AlreadyOpen { .. }))));
        assert_eq!(tracker.open_sessions().len(), 1);
        assert_eq!(ledger.transactions().len(), 8);
    }

    #[test]
    fn test_concurrent_replay_is_processed_once() {
        let (engine, tracker, ledger) = engine();
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    engine
                        .process_event(&event(5, "KA01AB1234|v1", "L1", 0))
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.iter().all(|tx| tx.kind == Some(ScanKind::Entry)));
        assert_eq!(tracker.open_sessions().len(), 1);
        assert_eq!(ledger.transactions().len(), 1);
    }

    #[test]
    fn test_offline_ledger_passes_unavailable_through() {
        let lots = LotRegistry::from_lots([ParkingLot::new(
            "L1",
            RatePolicy::per_hour(Decimal::new(10, 0)),
        )])
        .unwrap();
        let tracker = Arc::new(AsyncSessionTracker::new());
        let engine =
            AsyncTransactionEngine::new(Arc::new(lots), Arc::clone(&tracker), Arc::new(OfflineLedger));

        let result = engine.process_scan(&Vehicle::new("KA01AB1234", "v1"), "L1", at(0));

        assert_eq!(result, Err(ParkingError::unavailable("offline")));
        assert!(tracker.open_sessions().is_empty());
    }

    #[test]
    fn test_refused_exit_record_leaves_nothing_archived() {
        let lots = LotRegistry::from_lots([ParkingLot::new(
            "L1",
            RatePolicy::per_hour(Decimal::new(10, 0)),
        )])
        .unwrap();
        let tracker = Arc::new(AsyncSessionTracker::new());
        let ledger = Arc::new(RecordRefusingLedger::default());
        let engine =
            AsyncTransactionEngine::new(Arc::new(lots), Arc::clone(&tracker), ledger.clone());
        let vehicle = Vehicle::new("KA01AB1234", "v1");
        engine.process_scan(&vehicle, "L1", at(0)).unwrap();

        ledger.refuse_records.store(true, Ordering::SeqCst);
        let result = engine.process_scan(&vehicle, "L1", at(3600));
        assert_eq!(result, Err(ParkingError::unavailable("store offline")));
        assert!(ledger.inner.archived_sessions().is_empty());
        assert_eq!(tracker.open_sessions().len(), 1);

        ledger.refuse_records.store(false, Ordering::SeqCst);
        let exit = engine.process_scan(&vehicle, "L1", at(7200)).unwrap();
        assert_eq!(exit.charge_amount.to_string(), "20.00");

        let archived = ledger.inner.archived_sessions();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].exit_timestamp, Some(at(7200)));
    }

    #[test]
    fn test_event_reusing_self_assigned_id_is_a_conflict() {
        let (engine, tracker, ledger) = engine();
        let first = engine
            .process_scan(&Vehicle::new("AAA", "va"), "L1", at(0))
            .unwrap();
        assert_eq!(first.id, 1);

        let result = engine.process_event(&event(1, "BBB|vb", "L1", 10));

        assert_eq!(result, Err(ParkingError::sequence_conflict(1)));
        assert_eq!(ledger.transactions(), vec![first]);
        assert_eq!(tracker.open_sessions().len(), 1);
    }

    #[test]
    fn test_process_plate_keys_on_plate() {
        let (engine, tracker, _ledger) = engine();

        let entry = engine.process_plate("ka01ab1234", "L1", at(0)).unwrap();
        assert_eq!(entry.kind, Some(ScanKind::Entry));
        assert_eq!(entry.vehicle_id.as_deref(), Some("KA01AB1234"));
        assert!(tracker
            .find_open_session(&SessionKey::new("KA01AB1234", "L1"))
            .is_some());

        let exit = engine.process_plate("KA01AB1234", "L1", at(1800)).unwrap();
        assert_eq!(exit.kind, Some(ScanKind::Exit));
        assert_eq!(exit.charge_amount.to_string(), "5.00");
        assert!(tracker.open_sessions().is_empty());
    }

    #[test]
    fn test_failed_charge_uses_lot_scale_when_lot_is_known() {
        let (engine, _tracker, _ledger) = engine();

        let known = engine.process_event(&event(1, "ABC123", "L1", 0)).unwrap();
        let unknown = engine.process_event(&event(2, "ABC123", "L9", 0)).unwrap();

        assert_eq!(known.charge_amount.to_string(), "0.00");
        assert_eq!(unknown.charge_amount.to_string(), "0");
    }
}
