//! Concurrent implementations of the core components
//!
//! This module provides thread-safe versions of the session tracker, the
//! ledger and the engine, using DashMap for locking.
//!
//! - **AsyncSessionTracker**: per-pair locked session state
//! - **AsyncLedger**: thread-safe transaction history
//! - **AsyncTransactionEngine**: the entry/exit rules over both
//! - **BatchProcessor**: runs batches of scans partitioned by session key
//!
//! Scans of different pairs proceed in parallel; scans of the same pair are
//! serialized.

pub mod batch_processor;
pub mod engine;
pub mod ledger;
pub mod session_tracker;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use engine::AsyncTransactionEngine;
pub use ledger::AsyncLedger;
pub use session_tracker::AsyncSessionTracker;
