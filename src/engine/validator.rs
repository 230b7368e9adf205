//! OrderValidator: derives an order's current status.
//!
//! ## Priority
//!
//! 1. Invalid: malformed fields
//! 2. Expired: `now >= expiry`
//! 3. Cancelled: cancellation bit, pair salt floor, or consumed OTC nonce
//! 4. Filled: `filled >= capacity`
//! 5. Fillable
//!
//! Expiry and cancellation win over fill volume, so `Filled` only ever means
//! the order was consumed by fills.

use alloy_primitives::U256;

use crate::ledger::{hash_slot, nonce_slot, NonceRegistry, OrderRegistry, StateStore};
use crate::types::{
    Eip712Domain, LimitOrder, NftKind, NftOrder, Order, OrderInfo, OrderKind, OrderStatus,
    OtcOrder, RfqOrder, NATIVE_TOKEN,
};

/// Facts the status is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusInputs {
    pub malformed: bool,
    pub expired: bool,
    pub cancelled: bool,
    pub filled: u128,
    pub capacity: u128,
}

pub fn classify(inputs: StatusInputs) -> OrderStatus {
    if inputs.malformed {
        OrderStatus::Invalid
    } else if inputs.expired {
        OrderStatus::Expired
    } else if inputs.cancelled {
        OrderStatus::Cancelled
    } else if inputs.filled >= inputs.capacity {
        OrderStatus::Filled
    } else {
        OrderStatus::Fillable
    }
}

pub struct OrderValidator<'a, S: ?Sized> {
    state: &'a S,
    domain: &'a Eip712Domain,
    now: u64,
}

impl<'a, S: StateStore + ?Sized> OrderValidator<'a, S> {
    pub fn new(state: &'a S, domain: &'a Eip712Domain, now: u64) -> Self {
        Self { state, domain, now }
    }

    pub fn limit_info(&self, order: &LimitOrder) -> OrderInfo {
        let order_hash = order.hash(self.domain);
        let filled = self.state.filled_amount(order_hash);
        let cancel_bit = hash_slot(order_hash);

        let malformed = order.maker.is_zero()
            || order.maker_amount == 0
            || order.taker_amount == 0
            || order.maker_token == NATIVE_TOKEN
            || order.taker_token == NATIVE_TOKEN;
        let cancelled = self.state.is_cancelled(order.maker, cancel_bit)
            || order.salt
                < self.state.min_valid_salt(
                    OrderKind::Limit,
                    order.maker,
                    order.maker_token,
                    order.taker_token,
                );

        OrderInfo {
            order_hash,
            status: classify(StatusInputs {
                malformed,
                expired: self.now >= order.expiry,
                cancelled,
                filled,
                capacity: order.capacity(),
            }),
            filled_amount: filled,
        }
    }

    pub fn rfq_info(&self, order: &RfqOrder) -> OrderInfo {
        let order_hash = order.hash(self.domain);
        let filled = self.state.filled_amount(order_hash);
        let cancel_bit = hash_slot(order_hash);

        let malformed = order.maker.is_zero()
            || order.maker_amount == 0
            || order.taker_amount == 0
            || order.maker_token == NATIVE_TOKEN
            || order.taker_token == NATIVE_TOKEN;
        let cancelled = self.state.is_cancelled(order.maker, cancel_bit)
            || order.salt
                < self.state.min_valid_salt(
                    OrderKind::Rfq,
                    order.maker,
                    order.maker_token,
                    order.taker_token,
                );

        OrderInfo {
            order_hash,
            status: classify(StatusInputs {
                malformed,
                expired: self.now >= order.expiry,
                cancelled,
                filled,
                capacity: order.capacity(),
            }),
            filled_amount: filled,
        }
    }

    /// OTC orders keep no filled amount: the consumed nonce is the only record.
    pub fn otc_info(&self, order: &OtcOrder) -> OrderInfo {
        let order_hash = order.hash(self.domain);
        let (expiry, bucket, nonce) = OtcOrder::unpack_expiry_and_nonce(order.expiry_and_nonce);

        let malformed = order.maker.is_zero()
            || order.maker_amount == 0
            || order.taker_amount == 0
            || order.maker_token == NATIVE_TOKEN
            || order.taker_token == NATIVE_TOKEN;

        OrderInfo {
            order_hash,
            status: classify(StatusInputs {
                malformed,
                expired: self.now >= expiry,
                cancelled: nonce <= self.state.last_otc_nonce(order.maker, bucket),
                filled: 0,
                capacity: order.capacity(),
            }),
            filled_amount: 0,
        }
    }

    /// ERC-721 fills set the nonce bit, so a set bit on an order that
    /// recorded its single fill reports `Filled`, not `Cancelled`.
    pub fn nft_info(&self, order: &NftOrder) -> OrderInfo {
        let order_hash = order.hash(self.domain);
        let filled = self.state.filled_amount(order_hash);
        let cancel_bit = nonce_slot(order.nonce);

        let has_properties = !order.nft_token_properties.is_empty();
        let malformed = order.maker.is_zero()
            || (order.kind == NftKind::Erc1155 && order.nft_amount == 0)
            || (!order.is_sell() && order.erc20_token == NATIVE_TOKEN)
            || (has_properties && order.is_sell())
            || (has_properties && order.nft_token_id != U256::ZERO);

        let bit_set = self.state.is_cancelled(order.maker, cancel_bit);
        let cancelled = match order.kind {
            NftKind::Erc721 => bit_set && filled == 0,
            NftKind::Erc1155 => bit_set,
        };

        OrderInfo {
            order_hash,
            status: classify(StatusInputs {
                malformed,
                expired: U256::from(self.now) >= order.expiry,
                cancelled,
                filled,
                capacity: order.capacity(),
            }),
            filled_amount: filled,
        }
    }

    pub fn order_info(&self, order: &Order) -> OrderInfo {
        match order {
            Order::Limit(o) => self.limit_info(o),
            Order::Rfq(o) => self.rfq_info(o),
            Order::Otc(o) => self.otc_info(o),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
