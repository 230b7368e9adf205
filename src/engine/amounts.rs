//! FillAmountCalculator: clamps a fill request to remaining capacity and
//! prorates the linked amounts.
//!
//! Every linked amount is prorated independently from the original order
//! amounts, never from a running remainder. Rounding is down (favoring the
//! maker) unless a caller explicitly asks for [`Rounding::Up`].

use alloy_primitives::B256;

use crate::error::CapacityError;
use crate::types::amount::{mul_div_ceil, mul_div_floor};
use crate::types::{LimitOrder, OtcOrder, RfqOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Result of one fill computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillAmounts {
    /// Taker-token amount (or NFT quantity for ERC-1155 orders)
    pub taker_filled: u128,
    pub maker_filled: u128,
    pub fee_filled: u128,
}

pub struct FillAmountCalculator;

impl FillAmountCalculator {
    /// `amount * numerator / denominator`, rounded as requested
    pub fn prorate(
        amount: u128,
        numerator: u128,
        denominator: u128,
        rounding: Rounding,
    ) -> Result<u128, CapacityError> {
        let result = match rounding {
            Rounding::Down => mul_div_floor(amount, numerator, denominator),
            Rounding::Up => mul_div_ceil(amount, numerator, denominator),
        };
        result.ok_or(CapacityError::Overflow)
    }

    /// Clamp `requested` to `capacity - already_filled` and prorate.
    ///
    /// # Arguments
    ///
    /// * `capacity` - nominal taker amount of the order
    /// * `maker_amount` - nominal maker amount
    /// * `fee_amount` - nominal taker-paid fee (zero if none)
    /// * `requested` - taker amount the caller asked for
    /// * `already_filled` - cumulative taker amount filled so far
    pub fn compute_fill(
        order_hash: B256,
        capacity: u128,
        maker_amount: u128,
        fee_amount: u128,
        requested: u128,
        already_filled: u128,
    ) -> Result<FillAmounts, CapacityError> {
        let remaining = capacity.saturating_sub(already_filled);
        let taker_filled = requested.min(remaining);
        if taker_filled == 0 {
            return Err(CapacityError::ZeroFillAmount { order_hash });
        }
        Ok(FillAmounts {
            taker_filled,
            maker_filled: Self::prorate(taker_filled, maker_amount, capacity, Rounding::Down)?,
            fee_filled: Self::prorate(taker_filled, fee_amount, capacity, Rounding::Down)?,
        })
    }

    pub fn limit(
        order_hash: B256,
        order: &LimitOrder,
        requested: u128,
        already_filled: u128,
    ) -> Result<FillAmounts, CapacityError> {
        Self::compute_fill(
            order_hash,
            order.taker_amount,
            order.maker_amount,
            order.taker_token_fee_amount,
            requested,
            already_filled,
        )
    }

    pub fn rfq(
        order_hash: B256,
        order: &RfqOrder,
        requested: u128,
        already_filled: u128,
    ) -> Result<FillAmounts, CapacityError> {
        Self::compute_fill(
            order_hash,
            order.taker_amount,
            order.maker_amount,
            0,
            requested,
            already_filled,
        )
    }

    /// OTC orders fill at most once, so nothing is ever already filled.
    pub fn otc(order_hash: B256, order: &OtcOrder, requested: u128) -> Result<FillAmounts, CapacityError> {
        Self::compute_fill(
            order_hash,
            order.taker_amount,
            order.maker_amount,
            0,
            requested,
            0,
        )
    }

    /// Taker amount needed to receive `maker_target` from an order, rounded up.
    pub fn taker_for_maker_target(
        maker_target: u128,
        maker_amount: u128,
        taker_amount: u128,
    ) -> Result<u128, CapacityError> {
        Self::prorate(maker_target, taker_amount, maker_amount, Rounding::Up)
    }
}
