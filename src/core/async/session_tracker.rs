//! Thread-safe session tracking for concurrent scan processing
//!
//! This module provides the `AsyncSessionTracker` struct, which owns open
//! sessions using concurrent data structures so that scans from many gates
//! can be processed at once.
//!
//! # Design
//!
//! The tracker stores one `SessionSlot` per `(vehicle, lot)` pair in a
//! `DashMap`. `update` runs a closure while holding the DashMap entry guard
//! of the pair, which makes the whole read-decide-write step of a scan
//! atomic for that pair: two near-simultaneous scans of the same vehicle at
//! the same lot cannot both observe "no open session". Scans for other
//! pairs only contend when they hash to the same shard.
//!
//! # Thread Safety
//!
//! Closures passed to `update` must not call back into the tracker's map
//! for another key of the same shard; they may use the id allocator and any
//! other collaborator freely.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::session_slot::SessionSlot;
use crate::types::{ParkingError, ParkingSession, SessionId, SessionKey, Vehicle};

/// Thread-safe tracker of open sessions
#[derive(Debug)]
pub struct AsyncSessionTracker {
    /// Slots keyed by pair; emptied slots are removed after each update
    slots: DashMap<SessionKey, SessionSlot>,

    /// Source of session ids; ids are unique but may have gaps
    next_id: AtomicU64,
}

impl AsyncSessionTracker {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reserve a fresh session id
    pub fn allocate_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Run `f` with exclusive access to the slot of `key`
    ///
    /// The slot is created empty if the pair has no session, and dropped
    /// again if it is empty once `f` returns.
    ///
    /// # Arguments
    ///
    /// * `key` - The `(vehicle, lot)` pair to lock
    /// * `f` - Closure receiving the pair's slot
    ///
    /// # Returns
    ///
    /// Whatever `f` returns.
    pub fn update<F, T>(&self, key: &SessionKey, f: F) -> T
    where
        F: FnOnce(&mut SessionSlot) -> T,
    {
        let result = {
            let mut entry = self.slots.entry(key.clone()).or_default();
            f(entry.value_mut())
        };

        self.slots.remove_if(key, |_, slot| slot.is_empty());
        result
    }

    /// Snapshot of the open session for a pair
    pub fn find_open_session(&self, key: &SessionKey) -> Option<ParkingSession> {
        self.slots
            .get(key)
            .and_then(|slot| slot.open_session().cloned())
    }

    /// Open a session for a vehicle entering a lot
    ///
    /// # Errors
    ///
    /// Returns `AlreadyOpen` if the pair already has an open session.
    pub fn open_session(
        &self,
        vehicle: &Vehicle,
        lot_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ParkingSession, ParkingError> {
        let key = SessionKey::new(vehicle.vehicle_id.clone(), lot_id);
        self.update(&key, |slot| slot.open(self.allocate_id(), vehicle, lot_id, at))
    }

    /// Close an open session
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` if the session is not currently open.
    pub fn close_session(
        &self,
        session: &ParkingSession,
        at: DateTime<Utc>,
    ) -> Result<ParkingSession, ParkingError> {
        self.update(&session.key(), |slot| slot.close(session, at))
    }

    /// Snapshot of all open sessions, sorted by key
    pub fn open_sessions(&self) -> Vec<ParkingSession> {
        let mut sessions: Vec<ParkingSession> = self
            .slots
            .iter()
            .filter_map(|entry| entry.value().open_session().cloned())
            .collect();
        sessions.sort_by(|a, b| a.key().cmp(&b.key()));
        sessions
    }
}

impl Default for AsyncSessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
