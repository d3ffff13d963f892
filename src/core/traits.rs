//! Collaborator traits
//!
//! The engine talks to everything outside the session state machine through
//! these traits: the optical decoder and QR renderer on the device side, the
//! lot-management service, and the persistence store. Both the synchronous
//! and the concurrent engine are written against them.

use crate::types::{
    ParkingError, ParkingLot, ParkingSession, ParkingTransaction, SessionId, TransactionId,
};

/// Optical QR recognizer
///
/// Invoked once per camera frame. Returns at most one payload per physical
/// code; the engine only ever sees its string output.
pub trait FrameDecoder {
    /// Frame representation produced by the camera pipeline
    type Frame;

    /// Decode a frame, returning the payload text if a code was found
    fn decode(&mut self, frame: &Self::Frame) -> Option<String>;
}

/// QR image generator used for display only
pub trait PayloadRenderer {
    /// Rendered image type
    type Image;

    /// Render a payload string into an image
    fn render(&self, payload: &str) -> Result<Self::Image, ParkingError>;
}

/// Lot-management collaborator
pub trait LotLookup {
    /// Get a lot by id, or `None` if it is unknown
    fn get_lot(&self, lot_id: &str) -> Option<ParkingLot>;
}

/// Durable store for transactions and archived sessions (single owner)
///
/// Any failure must be reported as `ParkingError::Unavailable`.
pub trait TransactionLedger {
    /// Look up a previously recorded transaction
    fn find(&self, id: TransactionId) -> Result<Option<ParkingTransaction>, ParkingError>;

    /// Record a transaction
    fn record(&mut self, transaction: &ParkingTransaction) -> Result<(), ParkingError>;

    /// Archive a closed session; archiving the same session id again
    /// replaces the earlier copy
    fn archive(&mut self, session: &ParkingSession) -> Result<(), ParkingError>;

    /// Remove an archived session
    fn unarchive(&mut self, session_id: SessionId) -> Result<(), ParkingError>;

    /// Persist an exit: the closed session and its transaction, or neither
    fn commit_exit(
        &mut self,
        session: &ParkingSession,
        transaction: &ParkingTransaction,
    ) -> Result<(), ParkingError> {
        self.archive(session)?;
        if let Err(error) = self.record(transaction) {
            self.unarchive(session.id)?;
            return Err(error);
        }
        Ok(())
    }
}

/// Durable store shared between concurrent workers
///
/// Same contract as `TransactionLedger`, callable through a shared reference.
pub trait SharedLedger: Send + Sync {
    /// Look up a previously recorded transaction
    fn find(&self, id: TransactionId) -> Result<Option<ParkingTransaction>, ParkingError>;

    /// Record a transaction
    fn record(&self, transaction: &ParkingTransaction) -> Result<(), ParkingError>;

    /// Archive a closed session, replacing an earlier copy of the same id
    fn archive(&self, session: &ParkingSession) -> Result<(), ParkingError>;

    /// Remove an archived session
    fn unarchive(&self, session_id: SessionId) -> Result<(), ParkingError>;

    /// Persist an exit: the closed session and its transaction, or neither
    fn commit_exit(
        &self,
        session: &ParkingSession,
        transaction: &ParkingTransaction,
    ) -> Result<(), ParkingError> {
        self.archive(session)?;
        if let Err(error) = self.record(transaction) {
            self.unarchive(session.id)?;
            return Err(error);
        }
        Ok(())
    }
}
