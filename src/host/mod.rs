//! External collaborators.
//!
//! The engine decides; the host moves assets. Everything the engine needs
//! from the outside world goes through one of these traits:
//!
//! - [`AssetLedger`]: token, NFT and native transfers
//! - [`ProtocolFees`]: protocol fee quote and collection
//! - [`BridgeExecutor`]: external liquidity for quote legs
//! - [`FeeCallbacks`]: fee-recipient notification
//! - [`SignatureValidators`] / [`PropertyValidators`]: contract predicates
//! - [`Journal`]: checkpoints so a failed call leaves no asset movement behind
//!
//! [`MemoryHost`] implements all of them in memory.

mod memory;

pub use memory::{BridgeBehavior, CallbackBehavior, MemoryHost};

use alloy_primitives::{Address, B256, U256};

use crate::error::{BridgeError, FeeCallbackError, TransferError};

/// Value a fee recipient must return from its callback
pub const FEE_CALLBACK_MAGIC: [u8; 4] = [0x01, 0x90, 0x80, 0x5e];

/// Something a transfer can move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Asset {
    Fungible(Address),
    Erc721 { token: Address, id: U256 },
    Erc1155 { token: Address, id: U256 },
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Fungible(token) => write!(f, "{token}"),
            Asset::Erc721 { token, id } => write!(f, "{token}#{id}"),
            Asset::Erc1155 { token, id } => write!(f, "{token}[{id}]"),
        }
    }
}

pub trait AssetLedger {
    fn transfer(&mut self, asset: &Asset, from: Address, to: Address, amount: u128) -> Result<(), TransferError>;

    fn balance_of(&self, asset: &Asset, owner: Address) -> u128;
}

pub trait ProtocolFees {
    /// Fee for one fill at the current gas price
    fn protocol_fee_amount(&self, multiplier: u32) -> u128;

    /// Move `amount` of native value from `payer` into fee custody
    fn collect_protocol_fee(&mut self, payer: Address, amount: u128) -> Result<(), TransferError>;
}

/// One bridge leg, executed on behalf of `payer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeCall {
    pub source: B256,
    pub sell_token: Address,
    pub buy_token: Address,
    pub sell_amount: u128,
    pub min_buy_amount: u128,
    pub payer: Address,
    pub recipient: Address,
    pub data: Vec<u8>,
}

pub trait BridgeExecutor {
    /// Sell `call.sell_amount`, deliver the proceeds to `call.recipient`, and
    /// return the amount bought.
    fn execute_bridge(&mut self, call: &BridgeCall) -> Result<u128, BridgeError>;
}

pub trait FeeCallbacks {
    fn on_fee_received(
        &mut self,
        recipient: Address,
        token: Address,
        amount: u128,
        fee_data: &[u8],
    ) -> Result<[u8; 4], FeeCallbackError>;
}

pub trait SignatureValidators {
    fn is_valid_signature(&self, validator: Address, signer: Address, hash: B256, data: &[u8]) -> bool;
}

pub trait PropertyValidators {
    fn validate_property(
        &self,
        validator: Address,
        token: Address,
        token_id: U256,
        property_data: &[u8],
    ) -> bool;
}

/// Opaque journal position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(pub usize);

pub trait Journal {
    fn checkpoint(&mut self) -> Checkpoint;

    /// Undo everything recorded after `checkpoint`
    fn revert_to(&mut self, checkpoint: Checkpoint);

    /// Keep everything recorded after `checkpoint`
    fn release(&mut self, checkpoint: Checkpoint);
}

/// Everything the engine needs from its environment
pub trait Host:
    AssetLedger + ProtocolFees + BridgeExecutor + FeeCallbacks + SignatureValidators + PropertyValidators + Journal
{
}

impl<T> Host for T where
    T: AssetLedger + ProtocolFees + BridgeExecutor + FeeCallbacks + SignatureValidators + PropertyValidators + Journal
{
}
