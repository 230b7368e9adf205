//! BatchFillOrchestrator: runs one fill pipeline per order under a failure policy.
//!
//! ## Policies
//!
//! - `revert_if_incomplete == false`: each order runs atomically on its own.
//!   A failing order is reported as [`FillOutcome::Skipped`] and leaves no
//!   trace; the others commit.
//! - `revert_if_incomplete == true`: the first order that fails or fills less
//!   than requested aborts the batch with [`CapacityError::BatchIncomplete`],
//!   and the enclosing call discards every write.

use alloy_primitives::B256;
use tracing::{debug, warn};

use super::frame::Frame;
use super::native::FillResult;
use crate::error::{CapacityError, EngineError, Result};
use crate::host::Host;
use crate::ledger::StateStore;
use crate::types::BatchReceipt;

/// One item of a batch: which order, and how much of it was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSlot {
    pub order_hash: B256,
    pub requested: u128,
}

/// Result of one batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    Filled(FillResult),
    Skipped { order_hash: B256, error: EngineError },
}

impl FillOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled(_))
    }

    /// Taker amount filled, zero for skipped items
    pub fn taker_filled(&self) -> u128 {
        match self {
            FillOutcome::Filled(result) => result.taker_filled,
            FillOutcome::Skipped { .. } => 0,
        }
    }

    pub fn order_hash(&self) -> B256 {
        match self {
            FillOutcome::Filled(result) => result.order_hash,
            FillOutcome::Skipped { order_hash, .. } => *order_hash,
        }
    }

    pub fn error(&self) -> Option<&EngineError> {
        match self {
            FillOutcome::Filled(_) => None,
            FillOutcome::Skipped { error, .. } => Some(error),
        }
    }
}

/// Per-item outcomes of a committed batch plus its receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFillOutcome {
    pub outcomes: Vec<FillOutcome>,
    pub receipt: BatchReceipt,
}

impl BatchFillOutcome {
    /// One flag per input order, true where the order filled
    pub fn success_flags(&self) -> Vec<bool> {
        self.outcomes.iter().map(FillOutcome::is_filled).collect()
    }

    pub fn filled_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_filled()).count()
    }
}

pub struct BatchFillOrchestrator;

impl BatchFillOrchestrator {
    /// Reject mismatched parallel arrays and oversized batches.
    ///
    /// Pass `amounts == orders` for batch calls that take no amount list.
    pub fn check_shape(orders: usize, signatures: usize, amounts: usize, max: usize) -> Result<()> {
        if orders != signatures || orders != amounts {
            return Err(CapacityError::ArrayLengthMismatch {
                orders,
                signatures,
                amounts,
            }
            .into());
        }
        if orders > max {
            return Err(CapacityError::BatchTooLarge { len: orders, max }.into());
        }
        Ok(())
    }

    /// Run `fill` for every slot under the batch policy.
    ///
    /// # Arguments
    ///
    /// * `slots` - one entry per order, in execution order
    /// * `revert_if_incomplete` - abort on the first failed or short item
    /// * `fill` - the single-order pipeline for item `index`
    pub fn fill_many<'x, S, H, F>(
        frame: &mut Frame<'x, S, H>,
        slots: &[BatchSlot],
        revert_if_incomplete: bool,
        mut fill: F,
    ) -> Result<Vec<FillOutcome>>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
        F: FnMut(&mut Frame<'x, S, H>, usize) -> Result<FillResult>,
    {
        let mut outcomes = Vec::with_capacity(slots.len());

        for (index, slot) in slots.iter().enumerate() {
            match frame.atomically(|f| fill(f, index)) {
                Ok(result) => {
                    if revert_if_incomplete && result.taker_filled != slot.requested {
                        return Err(CapacityError::BatchIncomplete {
                            order_hash: slot.order_hash,
                            requested: slot.requested,
                            filled: result.taker_filled,
                        }
                        .into());
                    }
                    debug!(index, order_hash = %slot.order_hash, taker_filled = result.taker_filled, "batch item filled");
                    outcomes.push(FillOutcome::Filled(result));
                }
                Err(error) if revert_if_incomplete => {
                    warn!(index, order_hash = %slot.order_hash, kind = error.kind(), %error, "batch aborted");
                    return Err(CapacityError::BatchIncomplete {
                        order_hash: slot.order_hash,
                        requested: slot.requested,
                        filled: 0,
                    }
                    .into());
                }
                Err(error) => {
                    warn!(index, order_hash = %slot.order_hash, kind = error.kind(), %error, "batch item skipped");
                    outcomes.push(FillOutcome::Skipped {
                        order_hash: slot.order_hash,
                        error,
                    });
                }
            }
        }
        Ok(outcomes)
    }
}
