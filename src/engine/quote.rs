//! QuoteFillEngine: walks a caller-ordered list of liquidity legs toward one
//! target amount.
//!
//! ## Sides
//!
//! - **Sell**: spend exactly `target` of the sell token; `limit` is the
//!   minimum amount bought
//! - **Buy**: acquire at least `target` of the buy token; `limit` is the
//!   maximum amount sold
//!
//! ## Settlement
//!
//! The taker's input (the target for Sell, the limit for Buy) is escrowed at
//! the exchange before the walk. Every leg pays out of that escrow and
//! delivers straight to the caller. A leg that fails is unwound and skipped.
//! After the walk the aggregate is checked and unspent escrow is returned.
//!
//! ## Fractional targets
//!
//! A target with bit 255 set is a 1e18 fraction of the total capacity the
//! legs show at call time: input-side capacity for Sell, output-side for Buy.
//! It is resolved once, before the first leg runs. A limit leg's input
//! capacity includes the taker fee it would charge.
//!
//! ## Events
//!
//! Order legs emit the usual fill events. A bridge leg emits a
//! [`OrderKind::Bridge`] event keyed by its source id, so receipts commit to
//! every leg that moved funds.

use alloy_primitives::{Address, B256, U256};
use tracing::{debug, info, warn};

use super::amounts::{FillAmountCalculator, Rounding};
use super::frame::Frame;
use super::native::{fill_limit, fill_otc, fill_rfq, FillParties};
use crate::error::{CapacityError, EngineError, RestrictionError, Result, SettlementError};
use crate::host::{Asset, BridgeCall, Host};
use crate::ledger::StateStore;
use crate::types::amount::{from_fixed, FillTarget};
use crate::types::{
    address_bytes, BatchReceipt, FillEvent, LimitOrder, OrderKind, OrderStatus, OtcOrder, RfqOrder, Signature,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSide {
    Sell,
    Buy,
}

/// External liquidity quoted at `taker_token_amount` in for
/// `maker_token_amount` out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeLeg {
    pub source: B256,
    pub taker_token_amount: u128,
    pub maker_token_amount: u128,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteLeg {
    Bridge(BridgeLeg),
    Limit { order: LimitOrder, signature: Signature },
    Rfq { order: RfqOrder, signature: Signature },
    Otc { order: OtcOrder, signature: Signature },
}

impl QuoteLeg {
    fn label(&self) -> &'static str {
        match self {
            QuoteLeg::Bridge(_) => "bridge",
            QuoteLeg::Limit { .. } => "limit",
            QuoteLeg::Rfq { .. } => "rfq",
            QuoteLeg::Otc { .. } => "otc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub side: QuoteSide,
    pub sell_token: Address,
    pub buy_token: Address,
    /// Raw target word: an amount, or a fraction when bit 255 is set
    pub target: U256,
    /// Minimum bought for Sell, maximum sold for Buy
    pub limit: u128,
    pub legs: Vec<QuoteLeg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegOutcome {
    Filled { index: usize, sold: u128, bought: u128 },
    Skipped { index: usize, error: EngineError },
}

impl LegOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, LegOutcome::Filled { .. })
    }
}

/// Totals of a committed quote fill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteOutcome {
    pub sold: u128,
    pub bought: u128,
    pub legs: Vec<LegOutcome>,
    pub receipt: BatchReceipt,
}

/// Walk result before the receipt is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteWalk {
    pub sold: u128,
    pub bought: u128,
    pub legs: Vec<LegOutcome>,
}

fn remaining_capacity(
    status: OrderStatus,
    capacity: u128,
    filled: u128,
    maker_amount: u128,
) -> std::result::Result<(u128, u128), CapacityError> {
    if status != OrderStatus::Fillable {
        return Ok((0, 0));
    }
    let taker = capacity.saturating_sub(filled);
    let maker = FillAmountCalculator::prorate(taker, maker_amount, capacity, Rounding::Down)?;
    Ok((taker, maker))
}

pub struct QuoteFillEngine;

impl QuoteFillEngine {
    /// `(input capacity, output capacity)` a leg shows right now.
    ///
    /// Orders that are not fillable show zero.
    pub fn leg_capacity<S, H>(frame: &Frame<'_, S, H>, leg: &QuoteLeg) -> Result<(u128, u128)>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        let capacity = match leg {
            QuoteLeg::Bridge(bridge) => (bridge.taker_token_amount, bridge.maker_token_amount),
            QuoteLeg::Limit { order, .. } => {
                let info = frame.validator().limit_info(order);
                let (taker, maker) =
                    remaining_capacity(info.status, order.taker_amount, info.filled_amount, order.maker_amount)?;
                let fee = if taker == 0 {
                    0
                } else {
                    FillAmountCalculator::prorate(
                        taker,
                        order.taker_token_fee_amount,
                        order.taker_amount,
                        Rounding::Down,
                    )?
                };
                (taker.saturating_add(fee), maker)
            }
            QuoteLeg::Rfq { order, .. } => {
                let info = frame.validator().rfq_info(order);
                remaining_capacity(info.status, order.taker_amount, info.filled_amount, order.maker_amount)?
            }
            QuoteLeg::Otc { order, .. } => {
                let info = frame.validator().otc_info(order);
                remaining_capacity(info.status, order.taker_amount, 0, order.maker_amount)?
            }
        };
        Ok(capacity)
    }

    /// Resolve the target against the legs' observed capacity.
    pub fn resolve_target<S, H>(frame: &Frame<'_, S, H>, request: &QuoteRequest) -> Result<u128>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        let target = FillTarget::decode(request.target)?;
        let fraction = match target {
            FillTarget::Absolute(amount) => return Ok(amount),
            FillTarget::Fraction(fraction) => fraction,
        };

        let mut observed: u128 = 0;
        for leg in &request.legs {
            let (input, output) = Self::leg_capacity(frame, leg)?;
            let side = match request.side {
                QuoteSide::Sell => input,
                QuoteSide::Buy => output,
            };
            observed = observed.saturating_add(side);
        }
        let resolved = target.resolve(observed);
        debug!(fraction = %from_fixed(fraction), observed, resolved, "fractional target resolved");
        Ok(resolved)
    }

    /// Execute a quote inside `frame`.
    pub fn execute<S, H>(frame: &mut Frame<'_, S, H>, request: &QuoteRequest) -> Result<QuoteWalk>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        let target = Self::resolve_target(frame, request)?;
        let escrow = match request.side {
            QuoteSide::Sell => target,
            QuoteSide::Buy => request.limit,
        };
        Self::escrow_input(frame, request.sell_token, escrow)?;

        let mut sold: u128 = 0;
        let mut bought: u128 = 0;
        let mut legs = Vec::with_capacity(request.legs.len());

        for (index, leg) in request.legs.iter().enumerate() {
            let remaining = match request.side {
                QuoteSide::Sell => target.saturating_sub(sold),
                QuoteSide::Buy => target.saturating_sub(bought),
            };
            if remaining == 0 {
                break;
            }
            let budget = escrow.saturating_sub(sold);

            match frame.atomically(|f| Self::fill_leg(f, request, leg, remaining, budget)) {
                Ok((leg_sold, leg_bought)) => {
                    debug!(index, leg = leg.label(), sold = leg_sold, bought = leg_bought, "quote leg filled");
                    sold = sold.saturating_add(leg_sold);
                    bought = bought.saturating_add(leg_bought);
                    legs.push(LegOutcome::Filled {
                        index,
                        sold: leg_sold,
                        bought: leg_bought,
                    });
                }
                Err(error) => {
                    warn!(index, leg = leg.label(), kind = error.kind(), %error, "quote leg skipped");
                    legs.push(LegOutcome::Skipped { index, error });
                }
            }
        }

        match request.side {
            QuoteSide::Sell => {
                if sold < target {
                    return Err(CapacityError::IncompleteSell {
                        shortfall: target - sold,
                    }
                    .into());
                }
                if bought < request.limit {
                    return Err(CapacityError::Slippage {
                        bound: request.limit,
                        actual: bought,
                    }
                    .into());
                }
            }
            QuoteSide::Buy => {
                if bought < target {
                    return Err(CapacityError::IncompleteBuy {
                        shortfall: target - bought,
                    }
                    .into());
                }
                if sold > request.limit {
                    return Err(CapacityError::Slippage {
                        bound: request.limit,
                        actual: sold,
                    }
                    .into());
                }
            }
        }

        Self::refund_input(frame, request.sell_token, escrow.saturating_sub(sold))?;
        Ok(QuoteWalk { sold, bought, legs })
    }

    fn escrow_input<S, H>(frame: &mut Frame<'_, S, H>, token: Address, amount: u128) -> Result<()>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        if amount == 0 {
            return Ok(());
        }
        let (sender, exchange) = (frame.ctx.sender, frame.exchange());
        if token == frame.config.native_token {
            // Attached value already sits at the exchange
            frame
                .budget
                .spend(amount, sender)
                .map_err(SettlementError::from)?;
            return Ok(());
        }
        frame.transfer(&Asset::Fungible(token), sender, exchange, amount)
    }

    fn refund_input<S, H>(frame: &mut Frame<'_, S, H>, token: Address, amount: u128) -> Result<()>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        if amount == 0 {
            return Ok(());
        }
        if token == frame.config.native_token {
            frame.budget.credit(amount);
            return Ok(());
        }
        let (exchange, sender) = (frame.exchange(), frame.ctx.sender);
        frame.transfer(&Asset::Fungible(token), exchange, sender, amount)?;
        info!(%sender, %token, refunded = amount, "refunded unspent quote input");
        Ok(())
    }

    /// Fill one leg. Returns `(sold, bought)`.
    ///
    /// `remaining` is in input units for Sell and output units for Buy;
    /// `budget` is escrowed input still unspent.
    fn fill_leg<S, H>(
        frame: &mut Frame<'_, S, H>,
        request: &QuoteRequest,
        leg: &QuoteLeg,
        remaining: u128,
        budget: u128,
    ) -> Result<(u128, u128)>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        let parties = FillParties {
            taker: frame.ctx.sender,
            payer: frame.exchange(),
            recipient: frame.ctx.sender,
        };

        match leg {
            QuoteLeg::Bridge(bridge) => Self::fill_bridge(frame, request, bridge, remaining, budget),
            QuoteLeg::Limit { order, signature } => {
                Self::check_pair(request, order.maker_token, order.taker_token)?;
                let taker_fill = Self::order_taker_fill(
                    request.side,
                    remaining,
                    budget,
                    order.maker_amount,
                    order.taker_amount,
                    order.taker_token_fee_amount,
                )?;
                let result = fill_limit(frame, order, signature, taker_fill, parties)?;
                Ok((result.taker_filled + result.fee_filled, result.maker_filled))
            }
            QuoteLeg::Rfq { order, signature } => {
                Self::check_pair(request, order.maker_token, order.taker_token)?;
                let taker_fill = Self::order_taker_fill(
                    request.side,
                    remaining,
                    budget,
                    order.maker_amount,
                    order.taker_amount,
                    0,
                )?;
                let result = fill_rfq(frame, order, signature, taker_fill, parties)?;
                Ok((result.taker_filled, result.maker_filled))
            }
            QuoteLeg::Otc { order, signature } => {
                Self::check_pair(request, order.maker_token, order.taker_token)?;
                let taker_fill = Self::order_taker_fill(
                    request.side,
                    remaining,
                    budget,
                    order.maker_amount,
                    order.taker_amount,
                    0,
                )?;
                let result = fill_otc(frame, order, signature, taker_fill, parties)?;
                Ok((result.taker_filled, result.maker_filled))
            }
        }
    }

    fn check_pair(request: &QuoteRequest, maker_token: Address, taker_token: Address) -> Result<()> {
        if maker_token != request.buy_token || taker_token != request.sell_token {
            return Err(RestrictionError::TokenMismatch.into());
        }
        Ok(())
    }

    /// Taker amount to request from an order leg so that the taker spends at
    /// most `budget` including the prorated fee.
    fn order_taker_fill(
        side: QuoteSide,
        remaining: u128,
        budget: u128,
        maker_amount: u128,
        taker_amount: u128,
        fee_amount: u128,
    ) -> Result<u128> {
        let affordable = Self::taker_for_spend(budget, taker_amount, fee_amount)?;
        let wanted = match side {
            QuoteSide::Sell => Self::taker_for_spend(remaining, taker_amount, fee_amount)?,
            QuoteSide::Buy => {
                FillAmountCalculator::taker_for_maker_target(remaining, maker_amount, taker_amount)?
            }
        };
        Ok(wanted.min(affordable))
    }

    /// Largest taker fill `t` with `t + floor(t * fee / taker_amount) <= spend`.
    ///
    /// The proportional estimate can undershoot by a unit or two because the
    /// fee is floored, so it is stepped up until the next unit no longer fits.
    fn taker_for_spend(spend: u128, taker_amount: u128, fee_amount: u128) -> Result<u128> {
        if fee_amount == 0 || taker_amount == 0 {
            return Ok(spend);
        }
        let gross = taker_amount
            .checked_add(fee_amount)
            .ok_or(CapacityError::Overflow)?;
        let mut taker = FillAmountCalculator::prorate(spend, taker_amount, gross, Rounding::Down)?;
        loop {
            let next = taker.checked_add(1).ok_or(CapacityError::Overflow)?;
            let fee = FillAmountCalculator::prorate(next, fee_amount, taker_amount, Rounding::Down)?;
            match next.checked_add(fee) {
                Some(cost) if cost <= spend => taker = next,
                _ => return Ok(taker),
            }
        }
    }

    fn fill_bridge<S, H>(
        frame: &mut Frame<'_, S, H>,
        request: &QuoteRequest,
        bridge: &BridgeLeg,
        remaining: u128,
        budget: u128,
    ) -> Result<(u128, u128)>
    where
        S: StateStore + ?Sized,
        H: Host + ?Sized,
    {
        let wanted = match request.side {
            QuoteSide::Sell => remaining,
            QuoteSide::Buy => FillAmountCalculator::taker_for_maker_target(
                remaining,
                bridge.maker_token_amount,
                bridge.taker_token_amount,
            )?,
        };
        let sell_amount = wanted.min(bridge.taker_token_amount).min(budget);
        if sell_amount == 0 {
            return Err(CapacityError::ZeroFillAmount {
                order_hash: bridge.source,
            }
            .into());
        }

        let call = BridgeCall {
            source: bridge.source,
            sell_token: request.sell_token,
            buy_token: request.buy_token,
            sell_amount,
            min_buy_amount: 0,
            payer: frame.exchange(),
            recipient: frame.ctx.sender,
            data: bridge.data.clone(),
        };
        let bought = frame
            .host
            .execute_bridge(&call)
            .map_err(SettlementError::from)?;

        frame.emit(FillEvent {
            order_hash: bridge.source.0,
            kind: OrderKind::Bridge.to_u8(),
            taker: address_bytes(frame.ctx.sender),
            maker_token: address_bytes(request.buy_token),
            taker_token: address_bytes(request.sell_token),
            maker_token_filled_amount: bought,
            taker_token_filled_amount: sell_amount,
            timestamp: frame.ctx.timestamp,
            ..Default::default()
        });
        Ok((sell_amount, bought))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sell_leg_leaves_room_for_fee() {
        // 100 taker + 10 fee: spending 55 buys a 50 taker fill
        let fill = QuoteFillEngine::order_taker_fill(QuoteSide::Sell, 55, 1_000, 200, 100, 10).unwrap();
        assert_eq!(fill, 50);
    }

    #[test]
    fn test_sell_leg_spends_exactly_when_fee_floors() {
        // 100 taker + 7 fee: 50 taker costs 50 + 3 = 53, 51 would cost 54
        let fill = QuoteFillEngine::order_taker_fill(QuoteSide::Sell, 53, 1_000, 200, 100, 7).unwrap();
        assert_eq!(fill, 50);
        assert_eq!(QuoteFillEngine::taker_for_spend(110, 100, 10).unwrap(), 100);
        assert_eq!(QuoteFillEngine::taker_for_spend(1, 100, 7).unwrap(), 1);
        assert_eq!(QuoteFillEngine::taker_for_spend(1, 100, 150).unwrap(), 0);
    }

    #[test]
    fn test_buy_leg_rounds_taker_up() {
        // 7 maker for 3 taker: 5 maker out needs 3 taker in
        let fill = QuoteFillEngine::order_taker_fill(QuoteSide::Buy, 5, 1_000, 7, 3, 0).unwrap();
        assert_eq!(fill, 3);
    }

    #[test]
    fn test_leg_clamped_by_budget() {
        let fill = QuoteFillEngine::order_taker_fill(QuoteSide::Buy, 100, 20, 100, 100, 0).unwrap();
        assert_eq!(fill, 20);
    }

    #[test]
    fn test_pair_must_match() {
        let request = QuoteRequest {
            side: QuoteSide::Sell,
            sell_token: Address::repeat_byte(1),
            buy_token: Address::repeat_byte(2),
            target: U256::from(10u8),
            limit: 0,
            legs: vec![],
        };
        assert!(QuoteFillEngine::check_pair(&request, Address::repeat_byte(2), Address::repeat_byte(1)).is_ok());
        assert_eq!(
            QuoteFillEngine::check_pair(&request, Address::repeat_byte(1), Address::repeat_byte(2)),
            Err(RestrictionError::TokenMismatch.into())
        );
    }
}
