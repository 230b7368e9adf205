//! FeeAccountant: protocol fees, taker fees and NFT fee entries.
//!
//! Fee payment is part of settlement: a failed transfer, a reverting fee
//! callback or a wrong acknowledgement fails the whole fill, not just the fee.

use alloy_primitives::Address;
use tracing::debug;

use super::amounts::{FillAmountCalculator, Rounding};
use super::frame::Frame;
use crate::error::{CapacityError, FeeCallbackError, Result, SettlementError};
use crate::host::{Host, FEE_CALLBACK_MAGIC};
use crate::ledger::StateStore;
use crate::types::amount::u256_to_u128;
use crate::types::NftOrder;

pub struct FeeAccountant;

impl FeeAccountant {
    /// Charge the protocol fee for one fill out of the attached value.
    ///
    /// Returns the amount charged (zero when the host quotes no fee).
    pub fn pay_protocol_fee<S, H>(frame: &mut Frame<'_, S, H>) -> Result<u128>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        let fee = frame
            .host
            .protocol_fee_amount(frame.config.protocol_fee_multiplier);
        if fee == 0 {
            return Ok(0);
        }
        let available = frame.budget.remaining();
        if available < fee {
            return Err(SettlementError::InsufficientProtocolFee {
                required: fee,
                available,
            }
            .into());
        }
        frame
            .budget
            .spend(fee, frame.ctx.sender)
            .map_err(SettlementError::from)?;
        let exchange = frame.exchange();
        frame
            .host
            .collect_protocol_fee(exchange, fee)
            .map_err(SettlementError::from)?;
        debug!(fee, "protocol fee collected");
        Ok(fee)
    }

    /// Pay a limit order's prorated taker fee to its recipient.
    pub fn pay_taker_fee<S, H>(
        frame: &mut Frame<'_, S, H>,
        token: Address,
        payer: Address,
        fee_recipient: Address,
        amount: u128,
    ) -> Result<()>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        frame.pay(token, payer, fee_recipient, amount)
    }

    /// Pay every fee entry of an NFT order, prorated by `numerator / denominator`.
    ///
    /// Entries with non-empty `fee_data` notify their recipient, which must
    /// answer with [`FEE_CALLBACK_MAGIC`]. Returns the total paid.
    pub fn pay_nft_fees<S, H>(
        frame: &mut Frame<'_, S, H>,
        order: &NftOrder,
        payer: Address,
        numerator: u128,
        denominator: u128,
        rounding: Rounding,
    ) -> Result<u128>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        let mut total: u128 = 0;
        for fee in &order.fees {
            let nominal = u256_to_u128(fee.amount).ok_or(CapacityError::Overflow)?;
            let amount = FillAmountCalculator::prorate(nominal, numerator, denominator, rounding)?;

            frame.pay(order.erc20_token, payer, fee.recipient, amount)?;

            if !fee.fee_data.is_empty() {
                let returned = frame
                    .host
                    .on_fee_received(fee.recipient, order.erc20_token, amount, &fee.fee_data)
                    .map_err(SettlementError::from)?;
                if returned != FEE_CALLBACK_MAGIC {
                    return Err(SettlementError::from(FeeCallbackError::BadMagicValue {
                        recipient: fee.recipient,
                        returned: hex::encode(returned),
                    })
                    .into());
                }
            }
            total = total.checked_add(amount).ok_or(CapacityError::Overflow)?;
        }
        Ok(total)
    }
}
