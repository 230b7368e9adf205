//! Shared fixtures for the integration tests.
//!
//! Keys come from fixed seeds so every run signs identical orders.

#![allow(dead_code)]

use alloy_primitives::{address, Address, B256, U256};
use k256::ecdsa::SigningKey;

use fill_engine::engine::{CallContext, Exchange};
use fill_engine::host::MemoryHost;
use fill_engine::ledger::MemoryStore;
use fill_engine::types::{address_of, LimitOrder, NftOrder, OtcOrder, RfqOrder, Signature};
use fill_engine::EngineConfig;

pub type TestExchange = Exchange<MemoryStore, MemoryHost>;

pub const NOW: u64 = 1_700_000_000;
pub const EXPIRY: u64 = NOW + 3_600;

pub const MAKER_TOKEN: Address = address!("2000000000000000000000000000000000000002");
pub const TAKER_TOKEN: Address = address!("3000000000000000000000000000000000000003");
pub const NFT_TOKEN: Address = address!("4000000000000000000000000000000000000004");
pub const FEE_RECIPIENT: Address = address!("f000000000000000000000000000000000000001");
pub const TAKER: Address = address!("7a7e000000000000000000000000000000000001");
pub const RELAYER: Address = address!("7e1a000000000000000000000000000000000001");

pub fn key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).unwrap()
}

pub fn maker_key() -> SigningKey {
    key(0x11)
}

pub fn maker() -> Address {
    address_of(maker_key().verifying_key())
}

pub fn exchange() -> TestExchange {
    Exchange::new(EngineConfig::default(), MemoryStore::new(), MemoryHost::default()).unwrap()
}

/// Exchange with the maker and taker funded
pub fn funded_exchange() -> TestExchange {
    let mut ex = exchange();
    let host = ex.host_mut();
    host.mint_token(MAKER_TOKEN, maker(), 1_000_000);
    host.mint_token(TAKER_TOKEN, TAKER, 1_000_000);
    ex
}

pub fn ctx() -> CallContext {
    CallContext::new(TAKER, NOW)
}

/// The 100 taker / 200 maker / 10 fee order
pub fn limit_order(salt: u64) -> LimitOrder {
    LimitOrder {
        maker_token: MAKER_TOKEN,
        taker_token: TAKER_TOKEN,
        maker_amount: 200,
        taker_amount: 100,
        taker_token_fee_amount: 10,
        maker: maker(),
        fee_recipient: FEE_RECIPIENT,
        expiry: EXPIRY,
        salt: U256::from(salt),
        ..Default::default()
    }
}

pub fn rfq_order(salt: u64) -> RfqOrder {
    RfqOrder {
        maker_token: MAKER_TOKEN,
        taker_token: TAKER_TOKEN,
        maker_amount: 200,
        taker_amount: 100,
        maker: maker(),
        tx_origin: TAKER,
        expiry: EXPIRY,
        salt: U256::from(salt),
        ..Default::default()
    }
}

pub fn otc_order(bucket: u64, nonce: u128) -> OtcOrder {
    OtcOrder {
        maker_token: MAKER_TOKEN,
        taker_token: TAKER_TOKEN,
        maker_amount: 200,
        taker_amount: 100,
        maker: maker(),
        tx_origin: TAKER,
        expiry_and_nonce: OtcOrder::pack_expiry_and_nonce(EXPIRY, bucket, nonce),
        ..Default::default()
    }
}

pub fn sign(ex: &TestExchange, hash_of: impl FnOnce(&TestExchange) -> B256) -> Signature {
    Signature::eip712(&maker_key(), hash_of(ex)).unwrap()
}

pub fn sign_limit(ex: &TestExchange, order: &LimitOrder) -> Signature {
    sign(ex, |ex| ex.get_limit_order_hash(order))
}

pub fn sign_rfq(ex: &TestExchange, order: &RfqOrder) -> Signature {
    sign(ex, |ex| ex.get_rfq_order_hash(order))
}

pub fn sign_otc(ex: &TestExchange, order: &OtcOrder) -> Signature {
    sign(ex, |ex| ex.get_otc_order_hash(order))
}

pub fn sign_nft(ex: &TestExchange, order: &NftOrder) -> Signature {
    sign(ex, |ex| ex.get_nft_order_hash(order))
}

pub fn balance(ex: &TestExchange, token: Address, owner: Address) -> u128 {
    ex.host().token_balance(token, owner)
}
