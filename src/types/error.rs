//! Error types for the parking session engine
//!
//! This module defines every error that can occur while decoding scans and
//! driving sessions.
//!
//! # Error Categories
//!
//! - **Scan Errors**: malformed payloads, invalid input, unknown lots
//! - **Session Errors**: entry while open, exit while closed or never opened
//! - **Collaborator Errors**: persistence unavailable, failed workers
//! - **Caller Errors**: a scan sequence reused for a different scan
//! - **File I/O Errors**: file not found, unreadable CSV, etc.
//!
//! Scan and session errors are recoverable: the engine turns them into a
//! `Failed` transaction instead of returning them. `Unavailable` and
//! `SequenceConflict` are passed through to the caller.

use std::path::Path;
use thiserror::Error;

/// Main error type for the parking session engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParkingError {
    /// QR text does not split into exactly two non-empty fields
    #[error("Malformed payload '{payload}': expected '<vehicleNumber>|<vehicleId>'")]
    MalformedPayload {
        /// The payload as it was read
        payload: String,
    },

    /// A value handed to the core cannot be used
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the rejected value
        message: String,
    },

    /// The lot-lookup collaborator does not know the lot
    #[error("Unknown parking lot '{lot}'")]
    UnknownLot {
        /// Lot id that was looked up
        lot: String,
    },

    /// Entry scan while the vehicle already has an open session in the lot
    ///
    /// Guards against re-scanning a vehicle without an intervening exit.
    #[error("Vehicle {vehicle} already has an open session in lot {lot}")]
    AlreadyOpen {
        /// Vehicle id
        vehicle: String,
        /// Lot id
        lot: String,
    },

    /// Close requested for a session that is no longer open
    ///
    /// Guards against processing the same exit twice.
    #[error("Session {session} is already closed")]
    AlreadyClosed {
        /// Session id
        session: u64,
    },

    /// Exit scan for a vehicle with no open session in the lot
    #[error("Vehicle {vehicle} has no open session in lot {lot}")]
    NoOpenSession {
        /// Vehicle id
        vehicle: String,
        /// Lot id
        lot: String,
    },

    /// The persistence collaborator could not store a record
    ///
    /// This is the only error the engine returns instead of recording.
    #[error("Persistence unavailable: {message}")]
    Unavailable {
        /// Description reported by the store
        message: String,
    },

    /// A scan event reuses the sequence of a different, recorded scan
    ///
    /// Nothing is recorded; the recorded transaction keeps the id.
    #[error("Scan sequence {sequence} already belongs to a different scan")]
    SequenceConflict {
        /// The reused sequence
        sequence: u64,
    },

    /// A concurrent worker died before reporting its results
    #[error("Scan worker failed: {message}")]
    WorkerFailed {
        /// Description of the failure
        message: String,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// The offending row is skipped and processing continues.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for ParkingError {
    fn from(error: std::io::Error) -> Self {
        ParkingError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for ParkingError {
    fn from(error: csv::Error) -> Self {
        if error.is_io_error() {
            return ParkingError::IoError {
                message: error.to_string(),
            };
        }

        let line = error.position().map(|pos| pos.line());

        ParkingError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl ParkingError {
    /// Create a MalformedPayload error
    pub fn malformed_payload(payload: &str) -> Self {
        ParkingError::MalformedPayload {
            payload: payload.to_string(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ParkingError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an UnknownLot error
    pub fn unknown_lot(lot: &str) -> Self {
        ParkingError::UnknownLot {
            lot: lot.to_string(),
        }
    }

    /// Create an AlreadyOpen error
    pub fn already_open(vehicle: &str, lot: &str) -> Self {
        ParkingError::AlreadyOpen {
            vehicle: vehicle.to_string(),
            lot: lot.to_string(),
        }
    }

    /// Create an AlreadyClosed error
    pub fn already_closed(session: u64) -> Self {
        ParkingError::AlreadyClosed { session }
    }

    /// Create a NoOpenSession error
    pub fn no_open_session(vehicle: &str, lot: &str) -> Self {
        ParkingError::NoOpenSession {
            vehicle: vehicle.to_string(),
            lot: lot.to_string(),
        }
    }

    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        ParkingError::Unavailable {
            message: message.into(),
        }
    }

    /// Create a SequenceConflict error
    pub fn sequence_conflict(sequence: u64) -> Self {
        ParkingError::SequenceConflict { sequence }
    }

    /// Create a WorkerFailed error
    pub fn worker_failed(message: impl Into<String>) -> Self {
        ParkingError::WorkerFailed {
            message: message.into(),
        }
    }

    /// Map a failure to open `path`
    ///
    /// A missing file becomes `FileNotFound`; anything else is an `IoError`.
    pub fn open_failed(path: &Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            return ParkingError::FileNotFound {
                path: path.display().to_string(),
            };
        }

        ParkingError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), error),
        }
    }

    /// Whether processing can go on with the next scan or row
    ///
    /// Collaborator and file errors leave the run without a usable store,
    /// input or output and must stop it.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ParkingError::Unavailable { .. }
                | ParkingError::WorkerFailed { .. }
                | ParkingError::FileNotFound { .. }
                | ParkingError::IoError { .. }
        )
    }
}
