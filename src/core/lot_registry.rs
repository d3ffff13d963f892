//! In-memory lot registry
//!
//! Stand-in for the lot-management service: lots are loaded once (from CSV
//! or by hand) and are read-only afterwards, so the registry can be shared
//! between workers behind an `Arc` without locking.

use crate::core::traits::LotLookup;
use crate::types::{LotId, ParkingError, ParkingLot};
use std::collections::HashMap;

/// Lot registry keyed by lot id
#[derive(Debug, Clone, Default)]
pub struct LotRegistry {
    lots: HashMap<LotId, ParkingLot>,
}

impl LotRegistry {
    pub fn new() -> Self {
        LotRegistry {
            lots: HashMap::new(),
        }
    }

    /// Build a registry from a list of lots
    ///
    /// # Errors
    ///
    /// Fails on the first lot whose rate policy is invalid or whose id was
    /// already registered.
    pub fn from_lots(lots: impl IntoIterator<Item = ParkingLot>) -> Result<Self, ParkingError> {
        let mut registry = LotRegistry::new();
        for lot in lots {
            registry.insert(lot)?;
        }
        Ok(registry)
    }

    /// Register a lot
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the lot id is empty or already registered,
    /// or if its rate policy is invalid.
    pub fn insert(&mut self, lot: ParkingLot) -> Result<(), ParkingError> {
        if lot.lot_id.is_empty() {
            return Err(ParkingError::invalid_input("lot id is empty"));
        }
        lot.rate.validate()?;

        if self.lots.contains_key(&lot.lot_id) {
            return Err(ParkingError::invalid_input(format!(
                "lot '{}' is registered twice",
                lot.lot_id
            )));
        }

        self.lots.insert(lot.lot_id.clone(), lot);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}

impl LotLookup for LotRegistry {
    fn get_lot(&self, lot_id: &str) -> Option<ParkingLot> {
        self.lots.get(lot_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RatePolicy;
    use rust_decimal::Decimal;

    #[test]
    fn test_lookup_registered_lot() {
        let registry = LotRegistry::from_lots([
            ParkingLot::new("L1", RatePolicy::per_hour(Decimal::new(10, 0))),
            ParkingLot::new("L2", RatePolicy::per_hour(Decimal::new(5, 0))),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get_lot("L2").map(|lot| lot.rate.amount),
            Some(Decimal::new(5, 0))
        );
        assert!(registry.get_lot("L_missing").is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_lot() {
        let mut registry = LotRegistry::new();
        let lot = ParkingLot::new("L1", RatePolicy::per_hour(Decimal::new(10, 0)));

        registry.insert(lot.clone()).unwrap();
        let result = registry.insert(lot);

        assert!(matches!(result, Err(ParkingError::InvalidInput { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insert_rejects_invalid_rate() {
        let mut registry = LotRegistry::new();
        let mut rate = RatePolicy::per_hour(Decimal::new(10, 0));
        rate.unit_seconds = 0;

        assert!(registry.insert(ParkingLot::new("L1", rate)).is_err());
        assert!(registry.is_empty());
    }
}
