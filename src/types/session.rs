//! Parking session types
//!
//! A session is the interval a vehicle occupies a lot, from its entry scan to
//! its exit scan. At most one session per `SessionKey` may be open at a time.

use chrono::{DateTime, Utc};
use std::fmt;

use super::lot::LotId;
use super::vehicle::{Vehicle, VehicleId};

/// Session identifier, unique within one tracker
pub type SessionId = u64;

/// The `(vehicle, lot)` pair the one-open-session rule is stated over
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub vehicle_id: VehicleId,
    pub lot_id: LotId,
}

impl SessionKey {
    pub fn new(vehicle_id: impl Into<VehicleId>, lot_id: impl Into<LotId>) -> Self {
        SessionKey {
            vehicle_id: vehicle_id.into(),
            lot_id: lot_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.vehicle_id, self.lot_id)
    }
}

/// A vehicle's stay in a lot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingSession {
    pub id: SessionId,
    pub vehicle_id: VehicleId,

    /// Plate as it was read on entry (uppercased)
    pub vehicle_number: String,
    pub lot_id: LotId,
    pub entry_timestamp: DateTime<Utc>,

    /// Set exactly once, by the exit scan
    pub exit_timestamp: Option<DateTime<Utc>>,
}

impl ParkingSession {
    /// Open a new session for a vehicle entering a lot
    pub fn open(id: SessionId, vehicle: &Vehicle, lot_id: &str, at: DateTime<Utc>) -> Self {
        ParkingSession {
            id,
            vehicle_id: vehicle.vehicle_id.clone(),
            vehicle_number: vehicle.vehicle_number.clone(),
            lot_id: lot_id.to_string(),
            entry_timestamp: at,
            exit_timestamp: None,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.vehicle_id.clone(), self.lot_id.clone())
    }

    pub fn is_open(&self) -> bool {
        self.exit_timestamp.is_none()
    }
}
