//! Gate-side scanning loop
//!
//! A camera keeps decoding the same QR code on every frame while the pass
//! is held in front of it. The `ScanGate` lets the first payload through
//! and swallows everything after it until the operator acknowledges the
//! result, so one physical presentation produces one scan event.
//!
//! `Scanner` wires a `FrameDecoder` through the gate into the engine for a
//! single lot. `render_vehicle_pass` is the driver-side counterpart: it
//! turns a vehicle identity into the payload and hands it to a renderer.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::engine::TransactionEngine;
use crate::core::payload_codec;
use crate::core::traits::{FrameDecoder, LotLookup, PayloadRenderer, TransactionLedger};
use crate::types::{LotId, ParkingError, ParkingTransaction, Vehicle};

/// Suppresses repeated payloads until the current one is acknowledged
#[derive(Debug, Clone, Default)]
pub struct ScanGate {
    pending: Option<String>,
}

impl ScanGate {
    pub fn new() -> Self {
        ScanGate { pending: None }
    }

    /// Offer a decoded payload
    ///
    /// Returns the payload if the gate was idle, `None` while an earlier
    /// payload is still awaiting acknowledgement.
    pub fn offer(&mut self, payload: String) -> Option<String> {
        if self.pending.is_some() {
            return None;
        }
        self.pending = Some(payload.clone());
        Some(payload)
    }

    /// The payload awaiting acknowledgement
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Acknowledge the pending payload and accept the next one
    pub fn reset(&mut self) {
        self.pending = None;
    }
}

/// Scanner bound to one lot
pub struct Scanner<D: FrameDecoder> {
    decoder: D,
    gate: ScanGate,
    lot_id: LotId,
}

impl<D: FrameDecoder> Scanner<D> {
    pub fn new(decoder: D, lot_id: impl Into<LotId>) -> Self {
        Scanner {
            decoder,
            gate: ScanGate::new(),
            lot_id: lot_id.into(),
        }
    }

    /// Feed one camera frame
    ///
    /// # Returns
    ///
    /// * `Ok(Some(tx))` - The frame carried a new code and it was processed
    /// * `Ok(None)` - No code in the frame, or a result is still unacknowledged
    /// * `Err(ParkingError::Unavailable)` - The engine could not record the scan
    pub fn scan_frame<K, L>(
        &mut self,
        frame: &D::Frame,
        now: DateTime<Utc>,
        engine: &mut TransactionEngine<K, L>,
    ) -> Result<Option<ParkingTransaction>, ParkingError>
    where
        K: LotLookup,
        L: TransactionLedger,
    {
        let Some(payload) = self.decoder.decode(frame) else {
            return Ok(None);
        };
        let Some(payload) = self.gate.offer(payload) else {
            debug!(lot = %self.lot_id, "suppressing repeated scan");
            return Ok(None);
        };

        match engine.process_payload(&payload, &self.lot_id, now) {
            Ok(transaction) => Ok(Some(transaction)),
            Err(error) => {
                // Nothing was recorded; let the same code be scanned again
                self.gate.reset();
                Err(error)
            }
        }
    }

    /// Operator dismissed the result; accept the next code
    pub fn acknowledge(&mut self) {
        self.gate.reset();
    }

    pub fn lot_id(&self) -> &str {
        &self.lot_id
    }
}

/// Render the QR pass of a vehicle
///
/// # Errors
///
/// Returns `InvalidInput` if the vehicle identity cannot be encoded, or
/// whatever the renderer reports.
pub fn render_vehicle_pass<R: PayloadRenderer>(
    renderer: &R,
    vehicle: &Vehicle,
) -> Result<R::Image, ParkingError> {
    let payload = payload_codec::encode_vehicle(vehicle)?;
    renderer.render(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LotRegistry;
    use crate::types::{ParkingLot, RatePolicy, ScanKind};
    use rust_decimal::Decimal;

    /// Decoder whose frames already are the decoded text
    struct TextDecoder;

    impl FrameDecoder for TextDecoder {
        type Frame = Option<String>;

        fn decode(&mut self, frame: &Self::Frame) -> Option<String> {
            frame.clone()
        }
    }

    /// Renderer producing the payload bytes
    struct BytesRenderer;

    impl PayloadRenderer for BytesRenderer {
        type Image = Vec<u8>;

        fn render(&self, payload: &str) -> Result<Self::Image, ParkingError> {
            Ok(payload.as_bytes().to_vec())
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn engine() -> TransactionEngine {
        TransactionEngine::new(
            LotRegistry::from_lots([ParkingLot::new(
                "L1",
                RatePolicy::per_hour(Decimal::new(10, 0)),
            )])
            .unwrap(),
        )
    }

    #[test]
    fn test_gate_passes_first_payload_only() {
        let mut gate = ScanGate::new();

        assert_eq!(gate.offer("A|1".to_string()), Some("A|1".to_string()));
        assert_eq!(gate.offer("A|1".to_string()), None);
        assert_eq!(gate.offer("B|2".to_string()), None);
        assert_eq!(gate.pending(), Some("A|1"));

        gate.reset();
        assert_eq!(gate.offer("B|2".to_string()), Some("B|2".to_string()));
    }

    #[test]
    fn test_scanner_processes_one_scan_per_presentation() {
        let mut engine = engine();
        let mut scanner = Scanner::new(TextDecoder, "L1");
        let code = Some("ka01ab1234|v1".to_string());

        let first = scanner.scan_frame(&code, at(0), &mut engine).unwrap();
        assert_eq!(first.map(|tx| tx.kind), Some(Some(ScanKind::Entry)));

        // Same code on the following frames is ignored
        for secs in 1..5 {
            assert!(scanner.scan_frame(&code, at(secs), &mut engine).unwrap().is_none());
        }
        assert!(scanner.scan_frame(&None, at(5), &mut engine).unwrap().is_none());

        scanner.acknowledge();
        let exit = scanner.scan_frame(&code, at(3600), &mut engine).unwrap().unwrap();

        assert_eq!(exit.kind, Some(ScanKind::Exit));
        assert_eq!(exit.vehicle_number, "KA01AB1234");
        assert_eq!(exit.charge_amount.to_string(), "10.00");
        assert_eq!(engine.ledger().transactions().len(), 2);
    }

    #[test]
    fn test_render_vehicle_pass_uses_wire_format() {
        let image = render_vehicle_pass(&BytesRenderer, &Vehicle::new("KA01AB1234", "v1")).unwrap();
        assert_eq!(image, b"KA01AB1234|v1".to_vec());

        let invalid = render_vehicle_pass(&BytesRenderer, &Vehicle::new("KA|01", "v1"));
        assert!(matches!(invalid, Err(ParkingError::InvalidInput { .. })));
    }
}
