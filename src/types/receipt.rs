//! Receipt summarizing one batch or quote call.
//!
//! The receipt commits to the fills of the call through `events_root`, a
//! SHA-256 digest over the concatenated SSZ encodings of its fill events.

use sha2::{Digest, Sha256};
use ssz_rs::prelude::*;

use super::fill::FillEvent;

/// Summary of a batch or quote call.
///
/// ## Example
///
/// ```
/// use fill_engine::types::BatchReceipt;
///
/// let receipt = BatchReceipt::from_events(1, 3, &[], 1_700_000_000);
/// assert_eq!(receipt.fills_succeeded, 0);
/// assert_eq!(receipt.events_root, BatchReceipt::compute_hash(&[]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct BatchReceipt {
    /// Per-exchange sequence number of the call
    pub batch_id: u64,

    /// Number of orders or legs attempted
    pub orders_processed: u64,

    /// Number of fills committed
    pub fills_succeeded: u64,

    /// SHA-256 over the SSZ-encoded fill events of the call
    pub events_root: [u8; 32],

    /// Call timestamp in seconds
    pub timestamp: u64,
}

impl BatchReceipt {
    pub fn new(
        batch_id: u64,
        orders_processed: u64,
        fills_succeeded: u64,
        events_root: [u8; 32],
        timestamp: u64,
    ) -> Self {
        Self {
            batch_id,
            orders_processed,
            fills_succeeded,
            events_root,
            timestamp,
        }
    }

    /// Build a receipt committing to `events`
    pub fn from_events(
        batch_id: u64,
        orders_processed: u64,
        events: &[FillEvent],
        timestamp: u64,
    ) -> Self {
        let mut data = Vec::with_capacity(events.len() * 289);
        for event in events {
            data.extend_from_slice(&event.encode());
        }
        Self::new(
            batch_id,
            orders_processed,
            events.len() as u64,
            Self::compute_hash(&data),
            timestamp,
        )
    }

    /// Compute SHA-256 hash of the given data
    pub fn compute_hash(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        hash
    }

    pub fn events_root_hex(&self) -> String {
        hex::encode(self.events_root)
    }

    /// True when nothing was committed
    pub fn is_empty(&self) -> bool {
        self.fills_succeeded == 0
    }

    /// Fraction of attempted items that filled, or `None` for an empty call
    pub fn fill_rate(&self) -> Option<f64> {
        if self.orders_processed == 0 {
            None
        } else {
            Some(self.fills_succeeded as f64 / self.orders_processed as f64)
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
