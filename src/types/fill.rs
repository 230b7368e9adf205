//! Fill notifications.
//!
//! ## SSZ Serialization
//!
//! Every successful fill emits one [`FillEvent`]. Events are fixed-size SSZ
//! containers so a batch of them hashes to the same receipt root on every run.
//! Addresses are stored as raw 20-byte arrays and hashes as 32-byte arrays.

use alloy_primitives::{Address, B256, U256};
use ssz_rs::prelude::*;

use super::order::OrderKind;

/// Structured notification of one committed fill.
///
/// Fee fields are zero for orders that carry no fee; NFT fields are zero for
/// fungible orders.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct FillEvent {
    /// EIP-712 hash of the filled order
    pub order_hash: [u8; 32],

    /// Order family, see [`OrderKind::to_u8`]
    pub kind: u8,

    pub maker: [u8; 20],
    pub taker: [u8; 20],
    pub maker_token: [u8; 20],
    pub taker_token: [u8; 20],

    /// Maker-token amount delivered to the taker (NFT quantity for NFT sells)
    pub maker_token_filled_amount: u128,

    /// Taker-token amount delivered to the maker
    pub taker_token_filled_amount: u128,

    pub fee_recipient: [u8; 20],

    /// Prorated taker-paid fee (sum of all fee entries for NFT orders)
    pub fee_filled_amount: u128,

    /// Native protocol fee drawn for this fill
    pub protocol_fee_paid: u128,

    pub pool: [u8; 32],
    pub nft_token: [u8; 20],
    pub nft_token_id: [u8; 32],

    /// Call timestamp in seconds
    pub timestamp: u64,
}

impl FillEvent {
    pub fn order_hash(&self) -> B256 {
        B256::from(self.order_hash)
    }

    pub fn kind(&self) -> Option<OrderKind> {
        OrderKind::from_u8(self.kind)
    }

    pub fn maker(&self) -> Address {
        Address::from(self.maker)
    }

    pub fn taker(&self) -> Address {
        Address::from(self.taker)
    }

    pub fn maker_token(&self) -> Address {
        Address::from(self.maker_token)
    }

    pub fn taker_token(&self) -> Address {
        Address::from(self.taker_token)
    }

    pub fn fee_recipient(&self) -> Address {
        Address::from(self.fee_recipient)
    }

    pub fn nft_token_id(&self) -> U256 {
        U256::from_be_bytes(self.nft_token_id)
    }

    /// SSZ bytes of this event
    pub fn encode(&self) -> Vec<u8> {
        // Fixed-size container of basic types: serialization cannot fail
        ssz_rs::serialize(self).unwrap_or_default()
    }
}

/// Raw bytes of an address, for event fields.
pub fn address_bytes(address: Address) -> [u8; 20] {
    address.0 .0
}
