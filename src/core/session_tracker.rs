//! Session tracking module
//!
//! This module provides the `SessionTracker` struct, which exclusively owns
//! the set of open parking sessions and decides whether a vehicle is inside
//! a lot.
//!
//! The SessionTracker is responsible for:
//! - Opening a session on entry, at most one per `(vehicle, lot)` pair
//! - Closing a session on exit, at most once
//! - Allocating session ids
//! - Undoing a transition the persistence store refused

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::core::session_slot::SessionSlot;
use crate::types::{ParkingError, ParkingSession, SessionId, SessionKey, Vehicle};

/// Tracks open sessions for a single-threaded engine
#[derive(Debug)]
pub struct SessionTracker {
    /// Pairs with an open session; empty slots are dropped
    slots: HashMap<SessionKey, SessionSlot>,
    next_id: SessionId,
}

impl SessionTracker {
    /// Create a tracker with no open sessions
    pub fn new() -> Self {
        SessionTracker {
            slots: HashMap::new(),
            next_id: 1,
        }
    }

    /// Find the open session for a vehicle in a lot
    pub fn find_open_session(&self, key: &SessionKey) -> Option<&ParkingSession> {
        self.slots.get(key).and_then(SessionSlot::open_session)
    }

    /// Open a session for a vehicle entering a lot
    ///
    /// # Arguments
    ///
    /// * `vehicle` - Identity of the entering vehicle
    /// * `lot_id` - Lot the vehicle enters
    /// * `at` - Entry timestamp
    ///
    /// # Errors
    ///
    /// Returns `AlreadyOpen` if the vehicle already has an open session in
    /// the lot. Re-scanning a vehicle without an intervening exit must never
    /// create a second session.
    pub fn open_session(
        &mut self,
        vehicle: &Vehicle,
        lot_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ParkingSession, ParkingError> {
        let key = SessionKey::new(vehicle.vehicle_id.clone(), lot_id);
        let id = self.next_id;

        let session = self
            .slots
            .entry(key)
            .or_default()
            .open(id, vehicle, lot_id, at)?;

        self.next_id += 1;
        Ok(session)
    }

    /// Close an open session
    ///
    /// # Returns
    ///
    /// The closed session with `exit_timestamp` set; the pair is back to
    /// having no session.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` if the session is not currently open, e.g.
    /// when the same exit is processed twice.
    pub fn close_session(
        &mut self,
        session: &ParkingSession,
        at: DateTime<Utc>,
    ) -> Result<ParkingSession, ParkingError> {
        let key = session.key();
        let slot = self
            .slots
            .get_mut(&key)
            .ok_or_else(|| ParkingError::already_closed(session.id))?;

        let closed = slot.close(session, at)?;
        self.slots.remove(&key);
        Ok(closed)
    }

    /// Undo `open_session` after the store rejected the entry
    pub fn revert_open(&mut self, session: &ParkingSession) {
        let key = session.key();
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.revert_open(session);
            if slot.is_empty() {
                self.slots.remove(&key);
            }
        }
    }

    /// Undo `close_session` after the store rejected the exit
    pub fn revert_close(&mut self, session: &ParkingSession) {
        self.slots
            .entry(session.key())
            .or_default()
            .revert_close(session);
    }

    /// All open sessions, sorted by key
    pub fn open_sessions(&self) -> Vec<&ParkingSession> {
        let mut sessions: Vec<&ParkingSession> = self
            .slots
            .values()
            .filter_map(SessionSlot::open_session)
            .collect();
        sessions.sort_by(|a, b| a.key().cmp(&b.key()));
        sessions
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
