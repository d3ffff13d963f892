//! Charge computation
//!
//! A stay is charged `amount * elapsed_seconds / unit_seconds`, rounded half
//! up (midpoint away from zero) to the lot's smallest currency unit. The
//! function is pure: the same `(entry, exit, rate)` triple always yields the
//! same charge, which is what audits and reconciliation replay against.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{ParkingError, RatePolicy};

/// Compute the charge for a stay
///
/// Elapsed time is measured in whole seconds; sub-second remainders are
/// dropped before the rate is applied.
///
/// # Arguments
///
/// * `rate` - The lot's rate policy
/// * `entry` - Entry timestamp of the session
/// * `exit` - Exit timestamp of the session
///
/// # Returns
///
/// The charge, with exactly `rate.currency_scale` fractional digits.
///
/// # Errors
///
/// Returns `InvalidInput` if:
/// - `exit` precedes `entry`
/// - the rate policy is invalid
/// - the multiplication overflows
pub fn compute_charge(
    rate: &RatePolicy,
    entry: DateTime<Utc>,
    exit: DateTime<Utc>,
) -> Result<Decimal, ParkingError> {
    rate.validate()?;

    let elapsed = exit.signed_duration_since(entry).num_seconds();
    if elapsed < 0 {
        return Err(ParkingError::invalid_input(format!(
            "exit at {} precedes entry at {}",
            exit.to_rfc3339(),
            entry.to_rfc3339()
        )));
    }

    let raw = rate
        .amount
        .checked_mul(Decimal::from(elapsed))
        .and_then(|total| total.checked_div(Decimal::from(rate.unit_seconds)))
        .ok_or_else(|| {
            ParkingError::invalid_input(format!(
                "charge for {} seconds at {} overflows",
                elapsed, rate.amount
            ))
        })?;

    let mut charge =
        raw.round_dp_with_strategy(rate.currency_scale, RoundingStrategy::MidpointAwayFromZero);
    charge.rescale(rate.currency_scale);

    Ok(charge)
}
