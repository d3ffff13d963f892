//! Vehicle identity types
//!
//! A vehicle is identified by the id the vehicle registry assigned to it and
//! by its plate number. Only the id takes part in session matching; the
//! plate is carried along for display on transactions. A plate typed in at
//! the gate has no registry id and is matched on the plate itself.

/// Vehicle identifier assigned by the vehicle registry
pub type VehicleId = String;

/// Vehicle identity as carried in a QR payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vehicle {
    /// Registry identifier (second payload field)
    pub vehicle_id: VehicleId,

    /// Human-entered plate string (first payload field)
    pub vehicle_number: String,
}

impl Vehicle {
    /// Create a vehicle identity from its plate number and registry id
    pub fn new(vehicle_number: impl Into<String>, vehicle_id: impl Into<VehicleId>) -> Self {
        Vehicle {
            vehicle_id: vehicle_id.into(),
            vehicle_number: vehicle_number.into(),
        }
    }

    /// Identity for a manually entered plate
    ///
    /// The trimmed, uppercased plate serves as both id and number. Returns
    /// `None` for a blank plate.
    pub fn from_plate(vehicle_number: &str) -> Option<Self> {
        let plate = vehicle_number.trim().to_uppercase();
        if plate.is_empty() {
            return None;
        }
        Some(Vehicle::new(plate.clone(), plate))
    }

    /// Return a copy with the plate number uppercased for matching
    ///
    /// The id is left untouched; registry ids are case-sensitive.
    pub fn normalized(&self) -> Self {
        Vehicle {
            vehicle_id: self.vehicle_id.clone(),
            vehicle_number: self.vehicle_number.to_uppercase(),
        }
    }
}
