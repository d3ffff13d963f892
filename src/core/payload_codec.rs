//! QR payload codec
//!
//! The QR code printed on a driver's pass carries the ASCII text
//! `"<vehicleNumber>|<vehicleId>"`: `|` is the only separator, there are
//! exactly two fields and no escaping. This is the one bit-exact contract
//! between the pass generator and the gate scanner.
//!
//! Uppercasing of the plate is caller policy (`Vehicle::normalized`); the
//! codec returns fields exactly as they appear in the text.

use crate::types::{ParkingError, Vehicle};

/// Field separator of the payload text
pub const PAYLOAD_SEPARATOR: char = '|';

/// Encode a vehicle identity into payload text
///
/// # Errors
///
/// Returns `InvalidInput` if either field is empty or contains the separator,
/// since such a payload could not be decoded back.
pub fn encode(vehicle_number: &str, vehicle_id: &str) -> Result<String, ParkingError> {
    for (name, value) in [("vehicle number", vehicle_number), ("vehicle id", vehicle_id)] {
        if value.is_empty() {
            return Err(ParkingError::invalid_input(format!("{} is empty", name)));
        }
        if value.contains(PAYLOAD_SEPARATOR) {
            return Err(ParkingError::invalid_input(format!(
                "{} '{}' contains the payload separator '{}'",
                name, value, PAYLOAD_SEPARATOR
            )));
        }
    }

    Ok(format!("{}{}{}", vehicle_number, PAYLOAD_SEPARATOR, vehicle_id))
}

/// Encode a vehicle's identity
pub fn encode_vehicle(vehicle: &Vehicle) -> Result<String, ParkingError> {
    encode(&vehicle.vehicle_number, &vehicle.vehicle_id)
}

/// Decode payload text into a vehicle identity
///
/// # Errors
///
/// Returns `MalformedPayload` unless the text splits into exactly two
/// non-empty fields.
pub fn decode(raw: &str) -> Result<Vehicle, ParkingError> {
    let mut fields = raw.split(PAYLOAD_SEPARATOR);

    match (fields.next(), fields.next(), fields.next()) {
        (Some(number), Some(id), None) if !number.is_empty() && !id.is_empty() => {
            Ok(Vehicle::new(number, id))
        }
        _ => Err(ParkingError::malformed_payload(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plate_and_uuid("KA01AB1234", "3f2c9a1e-7d4b-4c55-9e0a-1b2c3d4e5f60")]
    #[case::lowercase_plate("ka01ab1234", "veh-1")]
    #[case::spaces_kept(" MH 12 ", " id ")]
    fn test_decode_reverses_encode(#[case] number: &str, #[case] id: &str) {
        let raw = encode(number, id).unwrap();
        let vehicle = decode(&raw).unwrap();

        assert_eq!(vehicle.vehicle_number, number);
        assert_eq!(vehicle.vehicle_id, id);
    }

    #[test]
    fn test_encode_wire_format() {
        assert_eq!(encode("KA01AB1234", "v1").unwrap(), "KA01AB1234|v1");
    }

    #[rstest]
    #[case::no_separator("ABC123")]
    #[case::three_fields("A|B|C")]
    #[case::empty_number("|v1")]
    #[case::empty_id("KA01|")]
    #[case::empty("")]
    #[case::only_separator("|")]
    fn test_decode_rejects_malformed(#[case] raw: &str) {
        let result = decode(raw);
        assert_eq!(result, Err(ParkingError::malformed_payload(raw)));
    }

    #[rstest]
    #[case::separator_in_number("KA|01", "v1")]
    #[case::separator_in_id("KA01", "v|1")]
    #[case::empty_number("", "v1")]
    #[case::empty_id("KA01", "")]
    fn test_encode_rejects_invalid_fields(#[case] number: &str, #[case] id: &str) {
        let result = encode(number, id);
        assert!(matches!(result, Err(ParkingError::InvalidInput { .. })));
    }
}
