//! Thread-safe transaction ledger for concurrent scan processing
//!
//! `AsyncLedger` is the in-memory `SharedLedger`: recorded transactions and
//! archived sessions live in `DashMap`s so that workers handling different
//! pairs can write without a global lock.

use dashmap::DashMap;

use crate::core::traits::SharedLedger;
use crate::types::{ParkingError, ParkingSession, ParkingTransaction, SessionId, TransactionId};

/// Thread-safe ledger backed by concurrent maps
#[derive(Debug, Default)]
pub struct AsyncLedger {
    transactions: DashMap<TransactionId, ParkingTransaction>,
    archived: DashMap<SessionId, ParkingSession>,
}

impl AsyncLedger {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            archived: DashMap::new(),
        }
    }

    /// Snapshot of all recorded transactions, sorted by id
    pub fn transactions(&self) -> Vec<ParkingTransaction> {
        let mut transactions: Vec<ParkingTransaction> = self
            .transactions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        transactions.sort_by_key(|tx| tx.id);
        transactions
    }

    /// Snapshot of all archived sessions, sorted by session id
    pub fn archived_sessions(&self) -> Vec<ParkingSession> {
        let mut sessions: Vec<ParkingSession> = self
            .archived
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|session| session.id);
        sessions
    }
}

impl SharedLedger for AsyncLedger {
    fn find(&self, id: TransactionId) -> Result<Option<ParkingTransaction>, ParkingError> {
        Ok(self.transactions.get(&id).map(|entry| entry.value().clone()))
    }

    fn record(&self, transaction: &ParkingTransaction) -> Result<(), ParkingError> {
        self.transactions
            .entry(transaction.id)
            .or_insert_with(|| transaction.clone());
        Ok(())
    }

    fn archive(&self, session: &ParkingSession) -> Result<(), ParkingError> {
        self.archived.insert(session.id, session.clone());
        Ok(())
    }

    fn unarchive(&self, session_id: SessionId) -> Result<(), ParkingError> {
        self.archived.remove(&session_id);
        Ok(())
    }
}
