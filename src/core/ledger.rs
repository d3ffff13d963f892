//! In-memory transaction ledger
//!
//! This module provides the `MemoryLedger`, the default persistence
//! collaborator of the single-threaded engine. It keeps every recorded
//! transaction, keyed by id, and every archived session.
//!
//! # Duplicate Handling
//!
//! If a transaction id is recorded twice, only the first record is kept.
//! The engine checks for replays before processing, so this only matters to
//! callers driving the ledger directly.

use std::collections::BTreeMap;

use crate::core::traits::TransactionLedger;
use crate::types::{ParkingError, ParkingSession, ParkingTransaction, SessionId, TransactionId};

/// Transaction ledger backed by in-memory collections
#[derive(Debug, Default)]
pub struct MemoryLedger {
    /// Recorded transactions, ordered by id
    transactions: BTreeMap<TransactionId, ParkingTransaction>,

    /// Closed sessions in the order they were first archived
    archived: Vec<ParkingSession>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger {
            transactions: BTreeMap::new(),
            archived: Vec::new(),
        }
    }

    /// All recorded transactions, sorted by id
    pub fn transactions(&self) -> Vec<&ParkingTransaction> {
        self.transactions.values().collect()
    }

    /// All archived sessions, oldest first
    pub fn archived_sessions(&self) -> &[ParkingSession] {
        &self.archived
    }
}

impl TransactionLedger for MemoryLedger {
    fn find(&self, id: TransactionId) -> Result<Option<ParkingTransaction>, ParkingError> {
        Ok(self.transactions.get(&id).cloned())
    }

    fn record(&mut self, transaction: &ParkingTransaction) -> Result<(), ParkingError> {
        self.transactions
            .entry(transaction.id)
            .or_insert_with(|| transaction.clone());
        Ok(())
    }

    fn archive(&mut self, session: &ParkingSession) -> Result<(), ParkingError> {
        match self.archived.iter_mut().find(|archived| archived.id == session.id) {
            Some(archived) => *archived = session.clone(),
            None => self.archived.push(session.clone()),
        }
        Ok(())
    }

    fn unarchive(&mut self, session_id: SessionId) -> Result<(), ParkingError> {
        self.archived.retain(|archived| archived.id != session_id);
        Ok(())
    }
}
