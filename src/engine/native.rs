//! Single-order fill pipelines for limit, RFQ and OTC orders.
//!
//! Every pipeline runs the same stages:
//!
//! 1. status must be `Fillable`
//! 2. taker / sender / origin restrictions
//! 3. maker signature
//! 4. fill amounts
//! 5. replay state (filled amount or OTC nonce) is written
//! 6. protocol fee, then asset transfers
//! 7. fill event
//!
//! Replay state is always written before the first external call.

use alloy_primitives::{Address, B256};
use tracing::debug;

use super::amounts::{FillAmountCalculator, FillAmounts};
use super::fees::FeeAccountant;
use super::frame::Frame;
use crate::error::{LifecycleError, ReplayError, RestrictionError, Result};
use crate::host::Host;
use crate::ledger::{NonceRegistry, OrderRegistry, StateStore};
use crate::types::{
    address_bytes, FillEvent, LimitOrder, OrderInfo, OrderKind, OrderStatus, OtcOrder, RfqOrder,
    Signature,
};

/// Who a fill is for.
///
/// `taker` is checked against order restrictions and named in events;
/// `payer` sends the taker token; `recipient` receives the maker token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillParties {
    pub taker: Address,
    pub payer: Address,
    pub recipient: Address,
}

impl FillParties {
    /// The taker pays and receives for itself
    pub fn direct(taker: Address) -> Self {
        Self {
            taker,
            payer: taker,
            recipient: taker,
        }
    }
}

/// Amounts settled by one fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillResult {
    pub order_hash: B256,
    pub taker_filled: u128,
    pub maker_filled: u128,
    pub fee_filled: u128,
    pub protocol_fee_paid: u128,
}

impl FillResult {
    fn new(order_hash: B256, amounts: FillAmounts, protocol_fee_paid: u128) -> Self {
        Self {
            order_hash,
            taker_filled: amounts.taker_filled,
            maker_filled: amounts.maker_filled,
            fee_filled: amounts.fee_filled,
            protocol_fee_paid,
        }
    }
}

pub(crate) fn require_fillable(info: &OrderInfo) -> Result<()> {
    if info.status != OrderStatus::Fillable {
        return Err(LifecycleError::NotFillable {
            order_hash: info.order_hash,
            status: info.status,
        }
        .into());
    }
    Ok(())
}

pub(crate) fn check_taker(order_hash: B256, restricted: Address, taker: Address) -> Result<()> {
    if !restricted.is_zero() && restricted != taker {
        return Err(RestrictionError::TakerMismatch {
            order_hash,
            expected: restricted,
            actual: taker,
        }
        .into());
    }
    Ok(())
}

/// The transaction origin must be the order's origin or one it registered.
fn check_origin<S: StateStore + ?Sized>(
    state: &S,
    order_hash: B256,
    required: Address,
    actual: Address,
) -> Result<()> {
    if required.is_zero() || (required != actual && !state.is_allowed_origin(required, actual)) {
        return Err(RestrictionError::OriginMismatch {
            order_hash,
            expected: required,
            actual,
        }
        .into());
    }
    Ok(())
}

// ============================================================================
// Limit orders
// ============================================================================

pub fn fill_limit<S, H>(
    frame: &mut Frame<'_, S, H>,
    order: &LimitOrder,
    signature: &Signature,
    requested: u128,
    parties: FillParties,
) -> Result<FillResult>
where
    S: StateStore + ?Sized,
    H: Host + ?Sized,
{
    let info = frame.validator().limit_info(order);
    let order_hash = info.order_hash;
    require_fillable(&info)?;

    check_taker(order_hash, order.taker, parties.taker)?;
    if !order.sender.is_zero() && order.sender != frame.ctx.sender {
        return Err(RestrictionError::SenderMismatch {
            order_hash,
            expected: order.sender,
            actual: frame.ctx.sender,
        }
        .into());
    }
    frame.verifier().verify(order_hash, order.maker, signature)?;

    let amounts = FillAmountCalculator::limit(order_hash, order, requested, info.filled_amount)?;
    frame
        .state
        .set_filled_amount(order_hash, info.filled_amount + amounts.taker_filled);
    debug!(%order_hash, requested, taker_filled = amounts.taker_filled, "limit order sized");

    let protocol_fee_paid = FeeAccountant::pay_protocol_fee(frame)?;
    frame.pay(order.taker_token, parties.payer, order.maker, amounts.taker_filled)?;
    frame.pay(order.maker_token, order.maker, parties.recipient, amounts.maker_filled)?;
    FeeAccountant::pay_taker_fee(
        frame,
        order.taker_token,
        parties.payer,
        order.fee_recipient,
        amounts.fee_filled,
    )?;

    frame.emit(FillEvent {
        order_hash: order_hash.0,
        kind: OrderKind::Limit.to_u8(),
        maker: address_bytes(order.maker),
        taker: address_bytes(parties.taker),
        maker_token: address_bytes(order.maker_token),
        taker_token: address_bytes(order.taker_token),
        maker_token_filled_amount: amounts.maker_filled,
        taker_token_filled_amount: amounts.taker_filled,
        fee_recipient: address_bytes(order.fee_recipient),
        fee_filled_amount: amounts.fee_filled,
        protocol_fee_paid,
        pool: order.pool.0,
        timestamp: frame.ctx.timestamp,
        ..Default::default()
    });
    Ok(FillResult::new(order_hash, amounts, protocol_fee_paid))
}

// ============================================================================
// RFQ orders
// ============================================================================

pub fn fill_rfq<S, H>(
    frame: &mut Frame<'_, S, H>,
    order: &RfqOrder,
    signature: &Signature,
    requested: u128,
    parties: FillParties,
) -> Result<FillResult>
where
    S: StateStore + ?Sized,
    H: Host + ?Sized,
{
    let info = frame.validator().rfq_info(order);
    let order_hash = info.order_hash;
    require_fillable(&info)?;

    check_taker(order_hash, order.taker, parties.taker)?;
    check_origin(&frame.state, order_hash, order.tx_origin, frame.ctx.tx_origin)?;
    frame.verifier().verify(order_hash, order.maker, signature)?;

    let amounts = FillAmountCalculator::rfq(order_hash, order, requested, info.filled_amount)?;
    frame
        .state
        .set_filled_amount(order_hash, info.filled_amount + amounts.taker_filled);
    debug!(%order_hash, requested, taker_filled = amounts.taker_filled, "rfq order sized");

    frame.pay(order.taker_token, parties.payer, order.maker, amounts.taker_filled)?;
    frame.pay(order.maker_token, order.maker, parties.recipient, amounts.maker_filled)?;

    frame.emit(FillEvent {
        order_hash: order_hash.0,
        kind: OrderKind::Rfq.to_u8(),
        maker: address_bytes(order.maker),
        taker: address_bytes(parties.taker),
        maker_token: address_bytes(order.maker_token),
        taker_token: address_bytes(order.taker_token),
        maker_token_filled_amount: amounts.maker_filled,
        taker_token_filled_amount: amounts.taker_filled,
        pool: order.pool.0,
        timestamp: frame.ctx.timestamp,
        ..Default::default()
    });
    Ok(FillResult::new(order_hash, amounts, 0))
}

// ============================================================================
// OTC orders
// ============================================================================

/// Fill an OTC order. A consumed nonce surfaces as a replay error rather
/// than a lifecycle error.
pub fn fill_otc<S, H>(
    frame: &mut Frame<'_, S, H>,
    order: &OtcOrder,
    signature: &Signature,
    requested: u128,
    parties: FillParties,
) -> Result<FillResult>
where
    S: StateStore + ?Sized,
    H: Host + ?Sized,
{
    let info = frame.validator().otc_info(order);
    let order_hash = info.order_hash;
    let (_, bucket, nonce) = OtcOrder::unpack_expiry_and_nonce(order.expiry_and_nonce);
    if info.status == OrderStatus::Cancelled {
        return Err(ReplayError::StaleNonce {
            maker: order.maker,
            bucket,
            nonce,
            stored: frame.state.last_otc_nonce(order.maker, bucket),
        }
        .into());
    }
    require_fillable(&info)?;

    check_taker(order_hash, order.taker, parties.taker)?;
    check_origin(&frame.state, order_hash, order.tx_origin, frame.ctx.tx_origin)?;
    frame.verifier().verify(order_hash, order.maker, signature)?;

    let amounts = FillAmountCalculator::otc(order_hash, order, requested)?;
    frame.state.consume_otc_nonce(order.maker, bucket, nonce)?;
    debug!(%order_hash, bucket, nonce, "otc nonce consumed");

    frame.pay(order.taker_token, parties.payer, order.maker, amounts.taker_filled)?;
    frame.pay(order.maker_token, order.maker, parties.recipient, amounts.maker_filled)?;

    frame.emit(FillEvent {
        order_hash: order_hash.0,
        kind: OrderKind::Otc.to_u8(),
        maker: address_bytes(order.maker),
        taker: address_bytes(parties.taker),
        maker_token: address_bytes(order.maker_token),
        taker_token: address_bytes(order.taker_token),
        maker_token_filled_amount: amounts.maker_filled,
        taker_token_filled_amount: amounts.taker_filled,
        timestamp: frame.ctx.timestamp,
        ..Default::default()
    });
    Ok(FillResult::new(order_hash, amounts, 0))
}

/// Fill an OTC order for a taker that signed the order hash itself. The
/// whole order is filled on the taker's behalf.
pub fn fill_taker_signed_otc<S, H>(
    frame: &mut Frame<'_, S, H>,
    order: &OtcOrder,
    maker_signature: &Signature,
    taker_signature: &Signature,
) -> Result<FillResult>
where
    S: StateStore + ?Sized,
    H: Host + ?Sized,
{
    let order_hash = order.hash(frame.domain);
    if order.taker.is_zero() {
        return Err(RestrictionError::TakerMismatch {
            order_hash,
            expected: order.taker,
            actual: frame.ctx.sender,
        }
        .into());
    }
    frame.verifier().verify(order_hash, order.taker, taker_signature)?;
    fill_otc(
        frame,
        order,
        maker_signature,
        order.taker_amount,
        FillParties::direct(order.taker),
    )
}
