//! Parking lot and rate policy types
//!
//! Lots are owned by the lot-management collaborator; the engine only reads
//! them through the `LotLookup` trait.

use rust_decimal::Decimal;

use super::error::ParkingError;

/// Parking lot identifier
pub type LotId = String;

/// Default billing unit: one hour
pub const DEFAULT_UNIT_SECONDS: u32 = 3600;

/// Default number of fractional digits of the lot currency
pub const DEFAULT_CURRENCY_SCALE: u32 = 2;

/// How a lot charges for the time a vehicle spends inside
///
/// The charge for a stay is `amount * elapsed_seconds / unit_seconds`,
/// rounded half up to `currency_scale` fractional digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatePolicy {
    /// Amount charged per billing unit
    pub amount: Decimal,

    /// Length of one billing unit in seconds
    pub unit_seconds: u32,

    /// Smallest currency unit, as a number of fractional digits
    pub currency_scale: u32,
}

impl RatePolicy {
    /// Hourly rate with the default currency scale
    pub fn per_hour(amount: Decimal) -> Self {
        RatePolicy {
            amount,
            unit_seconds: DEFAULT_UNIT_SECONDS,
            currency_scale: DEFAULT_CURRENCY_SCALE,
        }
    }

    /// Check that the policy can produce a charge
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the amount is negative or the billing unit
    /// is zero seconds long.
    pub fn validate(&self) -> Result<(), ParkingError> {
        if self.amount < Decimal::ZERO {
            return Err(ParkingError::invalid_input(format!(
                "rate amount {} is negative",
                self.amount
            )));
        }
        if self.unit_seconds == 0 {
            return Err(ParkingError::invalid_input("rate unit must be at least one second"));
        }
        Ok(())
    }
}

/// A parking lot with its rate policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingLot {
    pub lot_id: LotId,
    pub rate: RatePolicy,
}

impl ParkingLot {
    pub fn new(lot_id: impl Into<LotId>, rate: RatePolicy) -> Self {
        ParkingLot {
            lot_id: lot_id.into(),
            rate,
        }
    }
}
