//! Batch processing with session-key partitioning
//!
//! This module provides the `BatchProcessor` struct, which processes batches
//! of scan events concurrently while keeping the order of scans for each
//! `(vehicle, lot)` pair.
//!
//! # Design
//!
//! Each batch is partitioned by session key. Scans of one pair are handled
//! sequentially in input order on one tokio task; different pairs run on
//! separate tasks. Events whose payload does not decode have no key; they
//! can only fail, so they share one partition.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Arc<AsyncTransactionEngine>  (shared scan processor)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use super::AsyncTransactionEngine;
use crate::core::payload_codec;
use crate::types::{ParkingError, ParkingTransaction, ScanEvent, SessionKey};

/// Result of processing a single scan event
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The scan event that was processed
    pub event: ScanEvent,

    /// The recorded transaction, or the collaborator error that prevented it
    pub result: Result<ParkingTransaction, ParkingError>,
}

/// Batch processor with session-key partitioning
#[derive(Clone)]
pub struct BatchProcessor {
    engine: Arc<AsyncTransactionEngine>,
}

impl BatchProcessor {
    /// Create a new BatchProcessor
    pub fn new(engine: Arc<AsyncTransactionEngine>) -> Self {
        Self { engine }
    }

    /// Partition a batch of scans by session key
    ///
    /// # Returns
    ///
    /// A HashMap where:
    /// - Keys are session keys (`None` for undecodable payloads)
    /// - Values are the scans of that key, in original order
    pub fn partition_by_key(
        &self,
        batch: Vec<ScanEvent>,
    ) -> HashMap<Option<SessionKey>, Vec<ScanEvent>> {
        let mut partitions: HashMap<Option<SessionKey>, Vec<ScanEvent>> = HashMap::new();

        for event in batch {
            let key = payload_codec::decode(&event.raw_payload)
                .ok()
                .map(|vehicle| SessionKey::new(vehicle.vehicle_id, event.lot_id.clone()));
            partitions.entry(key).or_default().push(event);
        }

        partitions
    }

    /// Process the scans of a single key sequentially
    ///
    /// All events are processed, even if some fail. Results are in input
    /// order.
    pub async fn process_key_events(&self, events: Vec<ScanEvent>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(events.len());

        for event in events {
            let result = self.engine.process_event(&event);
            results.push(ProcessingResult { event, result });
        }

        results
    }

    /// Process a batch of scans with key-based partitioning
    ///
    /// 1. Partition the batch by session key
    /// 2. Spawn one tokio task per key
    /// 3. Wait for all tasks and collect the results
    ///
    /// Results of different keys may be interleaved in any order.
    ///
    /// # Errors
    ///
    /// Returns `WorkerFailed` if a partition task panicked or was cancelled.
    /// The other partitions are still awaited, but the batch's results are
    /// incomplete and discarded.
    pub async fn process_batch(
        &self,
        batch: Vec<ScanEvent>,
    ) -> Result<Vec<ProcessingResult>, ParkingError> {
        let partitions = self.partition_by_key(batch);

        let mut tasks = Vec::with_capacity(partitions.len());
        for (_key, events) in partitions {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_key_events(events).await
            }));
        }

        let mut results = Vec::new();
        let mut failure = None;
        for task in tasks {
            match task.await {
                Ok(key_results) => results.extend(key_results),
                Err(e) => {
                    error!(error = %e, "scan partition task failed");
                    failure.get_or_insert_with(|| ParkingError::worker_failed(e.to_string()));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
