//! Core business logic module
//!
//! This module contains the scan processing components:
//! - `traits` - Collaborator traits (decoder, renderer, lot lookup, ledger)
//! - `payload_codec` - QR payload text contract
//! - `charge` - Charge computation from a rate policy
//! - `lot_registry` - In-memory lot-lookup collaborator
//! - `session_slot` - Per-pair session state machine
//! - `session_tracker` - Ownership of open sessions
//! - `ledger` - In-memory persistence collaborator
//! - `engine` - Scan processing orchestration
//! - `scanner` - Frame-level duplicate suppression and pass rendering
//! - `async` - Concurrent implementations

pub mod r#async;
pub mod charge;
pub mod engine;
pub mod ledger;
pub mod lot_registry;
pub mod payload_codec;
pub mod scanner;
pub mod session_slot;
pub mod session_tracker;
pub mod traits;

pub use engine::TransactionEngine;
pub use ledger::MemoryLedger;
pub use lot_registry::LotRegistry;
pub use r#async::{AsyncLedger, AsyncSessionTracker, AsyncTransactionEngine, BatchProcessor};
pub use scanner::{render_vehicle_pass, ScanGate, Scanner};
pub use session_slot::SessionSlot;
pub use session_tracker::SessionTracker;
