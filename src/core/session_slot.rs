//! Per-pair session state machine
//!
//! Every `(vehicle, lot)` pair moves through
//! `NoSession -> Open -> Closed`, and a closed session drops the pair back to
//! `NoSession`. A `SessionSlot` holds the state of one pair and enforces the
//! transitions; both session trackers store one slot per key and only differ
//! in how they serialize access to it.

use chrono::{DateTime, Utc};

use crate::types::{ParkingError, ParkingSession, SessionId, Vehicle};

/// State of one `(vehicle, lot)` pair
///
/// An empty slot is `NoSession`. The closed state is never stored: closing
/// hands the session out for archiving and empties the slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSlot {
    open: Option<ParkingSession>,
}

impl SessionSlot {
    pub fn new() -> Self {
        SessionSlot { open: None }
    }

    /// The open session of this pair, if any
    pub fn open_session(&self) -> Option<&ParkingSession> {
        self.open.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none()
    }

    /// `NoSession -> Open`
    ///
    /// # Errors
    ///
    /// Returns `AlreadyOpen` if the pair already has an open session; the
    /// slot is left untouched.
    pub fn open(
        &mut self,
        id: SessionId,
        vehicle: &Vehicle,
        lot_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ParkingSession, ParkingError> {
        if let Some(existing) = &self.open {
            return Err(ParkingError::already_open(&existing.vehicle_id, &existing.lot_id));
        }

        let session = ParkingSession::open(id, vehicle, lot_id, at);
        self.open = Some(session.clone());
        Ok(session)
    }

    /// `Open -> Closed`
    ///
    /// # Returns
    ///
    /// The closed session, with its exit timestamp set.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` if `session` is not the one currently open
    /// here, which is what a second close of the same session looks like.
    pub fn close(
        &mut self,
        session: &ParkingSession,
        at: DateTime<Utc>,
    ) -> Result<ParkingSession, ParkingError> {
        match self.open.take() {
            Some(mut current) if current.id == session.id => {
                current.exit_timestamp = Some(at);
                Ok(current)
            }
            other => {
                self.open = other;
                Err(ParkingError::already_closed(session.id))
            }
        }
    }

    /// Undo an `open` whose result could not be persisted
    pub fn revert_open(&mut self, session: &ParkingSession) -> bool {
        if self.open.as_ref().is_some_and(|current| current.id == session.id) {
            self.open = None;
            return true;
        }
        false
    }

    /// Undo a `close` whose result could not be persisted
    pub fn revert_close(&mut self, session: &ParkingSession) -> bool {
        if self.open.is_some() {
            return false;
        }
        let mut reopened = session.clone();
        reopened.exit_timestamp = None;
        self.open = Some(reopened);
        true
    }
}
