//! ERC-721 and ERC-1155 order fills.

mod common;

use alloy_primitives::{Address, U256};
use common::*;

use fill_engine::engine::{CallContext, EntryPoint};
use fill_engine::error::{
    EngineError, FeeCallbackError, LifecycleError, ReplayError, RestrictionError, SettlementError,
};
use fill_engine::host::{Asset, AssetLedger, CallbackBehavior};
use fill_engine::types::{
    Fee, NftKind, NftOrder, OrderKind, OrderStatus, Property, Signature, TradeDirection, NATIVE_TOKEN,
};

const PROPERTY_VALIDATOR: Address = Address::repeat_byte(0x5a);
const CALLBACK_RECIPIENT: Address = Address::repeat_byte(0xcb);

fn erc721(id: u64) -> Asset {
    Asset::Erc721 { token: NFT_TOKEN, id: U256::from(id) }
}

fn erc1155(id: u64) -> Asset {
    Asset::Erc1155 { token: NFT_TOKEN, id: U256::from(id) }
}

/// Maker offers ERC-721 #7 for 500 taker tokens plus a 20 fee
fn offer(nonce: u64) -> NftOrder {
    NftOrder {
        kind: NftKind::Erc721,
        direction: TradeDirection::SellNft,
        maker: maker(),
        expiry: U256::from(EXPIRY),
        nonce: U256::from(nonce),
        erc20_token: TAKER_TOKEN,
        erc20_token_amount: U256::from(500u64),
        fees: vec![Fee { recipient: FEE_RECIPIENT, amount: U256::from(20u64), fee_data: vec![] }],
        nft_token: NFT_TOKEN,
        nft_token_id: U256::from(7u64),
        ..Default::default()
    }
}

/// Maker bids 300 maker tokens for any ERC-721 the validator accepts
fn bid(nonce: u64) -> NftOrder {
    NftOrder {
        direction: TradeDirection::BuyNft,
        erc20_token: MAKER_TOKEN,
        erc20_token_amount: U256::from(300u64),
        fees: vec![Fee { recipient: FEE_RECIPIENT, amount: U256::from(10u64), fee_data: vec![] }],
        nft_token_id: U256::ZERO,
        nft_token_properties: vec![Property { property_validator: PROPERTY_VALIDATOR, property_data: vec![1] }],
        ..offer(nonce)
    }
}

/// Maker offers 3 units of ERC-1155 #1 for 100 taker tokens plus a 10 fee
fn erc1155_offer(nonce: u64) -> NftOrder {
    NftOrder {
        kind: NftKind::Erc1155,
        erc20_token_amount: U256::from(100u64),
        fees: vec![Fee { recipient: FEE_RECIPIENT, amount: U256::from(10u64), fee_data: vec![] }],
        nft_token_id: U256::from(1u64),
        nft_amount: 3,
        ..offer(nonce)
    }
}

fn nft_balance(ex: &TestExchange, asset: &Asset, owner: Address) -> u128 {
    ex.host().balance_of(asset, owner)
}

// ============================================================================
// ERC-721
// ============================================================================

#[test]
fn test_buy_erc721() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(7), maker(), 1);
    let order = offer(1);
    let sig = sign_nft(&ex, &order);

    let result = ex.buy_erc721(ctx(), &order, &sig).unwrap();
    assert_eq!(result.taker_filled, 1);
    assert_eq!(result.maker_filled, 500);
    assert_eq!(result.fee_filled, 20);

    assert_eq!(nft_balance(&ex, &erc721(7), TAKER), 1);
    assert_eq!(balance(&ex, TAKER_TOKEN, maker()), 500);
    assert_eq!(balance(&ex, TAKER_TOKEN, FEE_RECIPIENT), 20);
    assert_eq!(ex.get_erc721_order_status(&order, NOW), OrderStatus::Filled);

    let event = &ex.events()[0];
    assert_eq!(event.kind(), Some(OrderKind::Erc721));
    assert_eq!(event.maker_token(), NFT_TOKEN);
    assert_eq!(event.nft_token_id(), U256::from(7u64));

    assert!(matches!(
        ex.buy_erc721(ctx(), &order, &sig),
        Err(EngineError::Lifecycle(LifecycleError::NotFillable { status: OrderStatus::Filled, .. }))
    ));
}

#[test]
fn test_buy_with_native_value() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(7), maker(), 1);
    ex.host_mut().mint_native(TAKER, 600);
    let order = NftOrder { erc20_token: NATIVE_TOKEN, ..offer(1) };
    let sig = sign_nft(&ex, &order);

    ex.buy_erc721(ctx().with_value(600), &order, &sig).unwrap();
    assert_eq!(balance(&ex, NATIVE_TOKEN, maker()), 500);
    assert_eq!(balance(&ex, NATIVE_TOKEN, FEE_RECIPIENT), 20);
    assert_eq!(balance(&ex, NATIVE_TOKEN, TAKER), 80);
}

#[test]
fn test_sell_into_property_bid() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(42), TAKER, 1);
    ex.host_mut().mint(erc721(43), TAKER, 1);
    let order = bid(1);
    let sig = sign_nft(&ex, &order);

    assert_eq!(
        ex.sell_erc721(ctx(), &order, &sig, U256::from(43u64)),
        Err(RestrictionError::PropertyRejected { validator: PROPERTY_VALIDATOR, token_id: U256::from(43u64) }.into())
    );

    ex.host_mut().approve_property(PROPERTY_VALIDATOR, U256::from(42u64));
    let result = ex.sell_erc721(ctx(), &order, &sig, U256::from(42u64)).unwrap();
    assert_eq!(result.maker_filled, 300);

    assert_eq!(nft_balance(&ex, &erc721(42), maker()), 1);
    assert_eq!(balance(&ex, MAKER_TOKEN, TAKER), 300);
    assert_eq!(balance(&ex, MAKER_TOKEN, FEE_RECIPIENT), 10);
    assert_eq!(ex.events()[0].nft_token_id(), U256::from(42u64));
}

#[test]
fn test_sell_rejects_value() {
    let mut ex = funded_exchange();
    let order = bid(1);
    let sig = sign_nft(&ex, &order);
    assert_eq!(
        ex.sell_erc721(ctx().with_value(1), &order, &sig, U256::from(42u64)),
        Err(RestrictionError::ValueNotAccepted.into())
    );
}

#[test]
fn test_kind_and_direction_checked() {
    let mut ex = funded_exchange();
    let order = offer(1);
    let sig = sign_nft(&ex, &order);

    assert_eq!(
        ex.buy_erc1155(ctx(), &order, &sig, 1),
        Err(RestrictionError::WrongNftKind { expected: "ERC-1155" }.into())
    );
    assert_eq!(
        ex.sell_erc721(ctx(), &order, &sig, U256::from(7u64)),
        Err(RestrictionError::WrongDirection.into())
    );
}

#[test]
fn test_cancelled_nonce() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(7), maker(), 1);
    let order = offer(0x105);
    let sig = sign_nft(&ex, &order);

    ex.cancel_nft_order(CallContext::new(maker(), NOW), U256::from(0x105u64)).unwrap();
    let bits = ex.get_nft_order_status_bit_vector(maker(), U256::from(1u64));
    assert!(bits.bit(5));
    assert_eq!(ex.get_erc721_order_status(&order, NOW), OrderStatus::Cancelled);

    assert_eq!(
        ex.buy_erc721(ctx(), &order, &sig),
        Err(ReplayError::NonceCancelled { maker: maker(), nonce: U256::from(0x105u64) }.into())
    );
}

#[test]
fn test_nft_nonce_cancel_leaves_limit_orders_alone() {
    let mut ex = funded_exchange();
    let order = limit_order(1);
    let sig = sign_limit(&ex, &order);
    let order_hash = ex.get_limit_order_hash(&order);

    // An NFT nonce with the same 256-bit value as the limit order hash
    ex.cancel_nft_order(CallContext::new(maker(), NOW), U256::from_be_bytes(order_hash.0))
        .unwrap();
    assert_eq!(ex.get_limit_order_info(&order, NOW).status, OrderStatus::Fillable);
    assert_eq!(ex.fill_limit_order(ctx(), &order, &sig, 10).unwrap().taker_filled, 10);

    ex.cancel_limit_order(CallContext::new(maker(), NOW), &order).unwrap();
    assert_eq!(ex.get_limit_order_info(&order, NOW).status, OrderStatus::Cancelled);
}

#[test]
fn test_presigned_nft_order() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(7), maker(), 1);
    let order = offer(1);

    assert!(ex.validate_nft_order_signature(&order, &Signature::PreSigned).is_err());
    assert!(ex.pre_sign_nft_order(ctx(), &order).is_err());
    ex.pre_sign_nft_order(CallContext::new(maker(), NOW), &order).unwrap();
    ex.validate_nft_order_signature(&order, &Signature::PreSigned).unwrap();
    ex.buy_erc721(ctx(), &order, &Signature::PreSigned).unwrap();
}

// ============================================================================
// ERC-1155
// ============================================================================

#[test]
fn test_erc1155_partial_fills_round_against_taker() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc1155(1), maker(), 3);
    let order = erc1155_offer(1);
    let sig = sign_nft(&ex, &order);

    // ceil(100 / 3) and ceil(10 / 3)
    let first = ex.buy_erc1155(ctx(), &order, &sig, 1).unwrap();
    assert_eq!(first.maker_filled, 34);
    assert_eq!(first.fee_filled, 4);
    let info = ex.get_erc1155_order_info(&order, NOW);
    assert_eq!(info.status, OrderStatus::Fillable);
    assert_eq!(info.filled_amount, 1);

    // Clamped to the 2 remaining units
    let rest = ex.buy_erc1155(ctx(), &order, &sig, 5).unwrap();
    assert_eq!(rest.taker_filled, 2);
    assert_eq!(rest.maker_filled, 67);
    assert_eq!(rest.fee_filled, 7);

    assert_eq!(nft_balance(&ex, &erc1155(1), TAKER), 3);
    assert_eq!(ex.get_erc1155_order_info(&order, NOW).status, OrderStatus::Filled);
}

#[test]
fn test_erc1155_bid_rounds_against_maker() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc1155(1), TAKER, 3);
    let order = NftOrder {
        direction: TradeDirection::BuyNft,
        erc20_token: MAKER_TOKEN,
        ..erc1155_offer(1)
    };
    let sig = sign_nft(&ex, &order);

    let result = ex.sell_erc1155(ctx(), &order, &sig, U256::from(1u64), 1).unwrap();
    assert_eq!(result.maker_filled, 33);
    assert_eq!(result.fee_filled, 3);
    assert_eq!(balance(&ex, MAKER_TOKEN, TAKER), 33);
    assert_eq!(nft_balance(&ex, &erc1155(1), maker()), 1);
}

#[test]
fn test_batch_buy_skips_cancelled() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(7), maker(), 1);
    ex.host_mut().mint(erc721(8), maker(), 1);
    let orders = vec![offer(1), NftOrder { nft_token_id: U256::from(8u64), ..offer(2) }];
    let sigs: Vec<_> = orders.iter().map(|o| sign_nft(&ex, o)).collect();
    ex.cancel_nft_order(CallContext::new(maker(), NOW), U256::from(2u64)).unwrap();

    let root = ex.store().state_root();
    assert!(ex.batch_buy_erc721s(ctx(), &orders, &sigs, true).is_err());
    assert_eq!(ex.store().state_root(), root);

    let outcome = ex.batch_buy_erc721s(ctx(), &orders, &sigs, false).unwrap();
    assert_eq!(outcome.success_flags(), vec![true, false]);
    assert_eq!(outcome.outcomes[1].error().map(EngineError::kind), Some("replay"));
}

#[test]
fn test_batch_buy_erc1155s() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc1155(1), maker(), 3);
    let order = erc1155_offer(1);
    let sig = sign_nft(&ex, &order);

    let outcome = ex
        .batch_buy_erc1155s(ctx(), &[order.clone(), order.clone()], &[sig.clone(), sig], &[2, 2], false)
        .unwrap();
    assert_eq!(outcome.outcomes[0].taker_filled(), 2);
    assert_eq!(outcome.outcomes[1].taker_filled(), 1);
    assert_eq!(nft_balance(&ex, &erc1155(1), TAKER), 3);
}

// ============================================================================
// Fee callbacks
// ============================================================================

fn with_callback_fee(order: NftOrder) -> NftOrder {
    let mut fees = order.fees.clone();
    fees.push(Fee { recipient: CALLBACK_RECIPIENT, amount: U256::from(5u64), fee_data: vec![0xaa] });
    NftOrder { fees, ..order }
}

#[test]
fn test_fee_callback_accepts() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(7), maker(), 1);
    let order = with_callback_fee(offer(1));
    let sig = sign_nft(&ex, &order);

    let result = ex.buy_erc721(ctx(), &order, &sig).unwrap();
    assert_eq!(result.fee_filled, 25);
    assert_eq!(balance(&ex, TAKER_TOKEN, CALLBACK_RECIPIENT), 5);
}

#[test]
fn test_wrong_magic_reverts_fill() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(7), maker(), 1);
    ex.host_mut().register_fee_callback(CALLBACK_RECIPIENT, CallbackBehavior::WrongMagic);
    let order = with_callback_fee(offer(1));
    let sig = sign_nft(&ex, &order);

    assert!(matches!(
        ex.buy_erc721(ctx(), &order, &sig),
        Err(EngineError::Settlement(SettlementError::FeeCallback(FeeCallbackError::BadMagicValue { .. })))
    ));
    assert_eq!(nft_balance(&ex, &erc721(7), maker()), 1);
    assert_eq!(balance(&ex, TAKER_TOKEN, TAKER), 1_000_000);
    assert_eq!(ex.get_erc721_order_status(&order, NOW), OrderStatus::Fillable);
}

#[test]
fn test_reentrant_callback_reverts_fill() {
    let mut ex = funded_exchange();
    ex.host_mut().mint(erc721(7), maker(), 1);
    let guard = ex.guard();
    ex.host_mut()
        .register_fee_callback(CALLBACK_RECIPIENT, CallbackBehavior::Reenter(guard, EntryPoint::Fill));
    let order = with_callback_fee(offer(1));
    let sig = sign_nft(&ex, &order);
    let root = ex.store().state_root();

    match ex.buy_erc721(ctx(), &order, &sig) {
        Err(EngineError::Settlement(SettlementError::FeeCallback(FeeCallbackError::Reverted { recipient, reason }))) => {
            assert_eq!(recipient, CALLBACK_RECIPIENT);
            assert!(reason.contains("reentrant"));
        }
        other => panic!("expected reverted callback, got {other:?}"),
    }
    assert_eq!(ex.store().state_root(), root);
    assert_eq!(nft_balance(&ex, &erc721(7), TAKER), 0);
    assert!(ex.guard().active().is_none());
}
