//! Error taxonomy for the fill engine.
//!
//! Every failure the engine can raise belongs to one family. Single-order
//! operations surface the first failure unchanged; batch and quote operations
//! wrap or swallow them according to their policy.

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

use crate::types::OrderStatus;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level engine error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("replay rejected: {0}")]
    Replay(#[from] ReplayError),

    #[error("order not fillable: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("capacity: {0}")]
    Capacity(#[from] CapacityError),

    #[error("restriction violated: {0}")]
    Restriction(#[from] RestrictionError),

    #[error("settlement failed: {0}")]
    Settlement(#[from] SettlementError),

    /// A guarded entry point was entered while another was executing
    #[error("reentrant call into {entered} while {active} is executing")]
    Reentrancy {
        active: &'static str,
        entered: &'static str,
    },

    #[error("configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Short family name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Authorization(_) => "authorization",
            EngineError::Replay(_) => "replay",
            EngineError::Lifecycle(_) => "lifecycle",
            EngineError::Capacity(_) => "capacity",
            EngineError::Restriction(_) => "restriction",
            EngineError::Settlement(_) => "settlement",
            EngineError::Reentrancy { .. } => "reentrancy",
            EngineError::Config(_) => "config",
        }
    }
}

// ============================================================================
// Families
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("order {order_hash} was not signed by {expected}")]
    InvalidSigner { order_hash: B256, expected: Address },

    #[error("malformed signature: {0}")]
    MalformedSignature(&'static str),

    #[error("validator {validator} rejected signature for {signer}")]
    ValidatorRejected { signer: Address, validator: Address },

    #[error("no signature validator registered for {0}")]
    NoValidatorRegistered(Address),

    #[error("wallet-delegated signatures may not nest")]
    NestedDelegation,

    #[error("{delegate} is not a registered signer for {maker}")]
    DelegateNotRegistered { maker: Address, delegate: Address },

    #[error("only the maker {maker} may presign, caller was {caller}")]
    OnlyMakerMayPresign { maker: Address, caller: Address },

    #[error("only the maker {maker} or its signers may cancel, caller was {caller}")]
    OnlyMakerMayCancel { maker: Address, caller: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("nonce {nonce} for {maker} in bucket {bucket} is not above stored {stored}")]
    StaleNonce {
        maker: Address,
        bucket: u64,
        nonce: u128,
        stored: u128,
    },

    #[error("nonce {nonce} for {maker} is already used or cancelled")]
    NonceCancelled { maker: Address, nonce: U256 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("order {order_hash} has status {status:?}")]
    NotFillable { order_hash: B256, status: OrderStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("fill of order {order_hash} computes to zero")]
    ZeroFillAmount { order_hash: B256 },

    #[error("fill-or-kill: requested {requested}, filled {filled}")]
    FillOrKillFailed { requested: u128, filled: u128 },

    #[error("batch incomplete at order {order_hash}: requested {requested}, filled {filled}")]
    BatchIncomplete {
        order_hash: B256,
        requested: u128,
        filled: u128,
    },

    #[error("incomplete sell: {shortfall} input unspent")]
    IncompleteSell { shortfall: u128 },

    #[error("incomplete buy: {shortfall} output not acquired")]
    IncompleteBuy { shortfall: u128 },

    #[error("slippage: bound {bound}, actual {actual}")]
    Slippage { bound: u128, actual: u128 },

    #[error("array lengths differ: {orders} orders, {signatures} signatures, {amounts} amounts")]
    ArrayLengthMismatch {
        orders: usize,
        signatures: usize,
        amounts: usize,
    },

    #[error("batch of {len} exceeds limit {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("target amount does not fit in 128 bits")]
    TargetOutOfRange,

    #[error("amount arithmetic overflowed")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestrictionError {
    #[error("order {order_hash} restricts taker to {expected}, got {actual}")]
    TakerMismatch {
        order_hash: B256,
        expected: Address,
        actual: Address,
    },

    #[error("order {order_hash} restricts sender to {expected}, got {actual}")]
    SenderMismatch {
        order_hash: B256,
        expected: Address,
        actual: Address,
    },

    #[error("order {order_hash} requires origin {expected}, got {actual}")]
    OriginMismatch {
        order_hash: B256,
        expected: Address,
        actual: Address,
    },

    #[error("origin registration must come from the origin itself")]
    OnlyOriginMayRegister,

    #[error("property validator {validator} rejected token {token_id}")]
    PropertyRejected { validator: Address, token_id: U256 },

    #[error("token id {actual} does not match order token id {expected}")]
    TokenIdMismatch { expected: U256, actual: U256 },

    #[error("native value is not accepted by this operation")]
    ValueNotAccepted,

    #[error("order direction does not match the operation")]
    WrongDirection,

    #[error("order is not an {expected} order")]
    WrongNftKind { expected: &'static str },

    #[error("leg token pair does not match the quote")]
    TokenMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    FeeCallback(#[from] FeeCallbackError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("protocol fee {required} exceeds remaining value {available}")]
    InsufficientProtocolFee { required: u128, available: u128 },
}

// ============================================================================
// Collaborator errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("{owner} holds {available} of {asset}, needs {required}")]
    InsufficientBalance {
        asset: String,
        owner: Address,
        available: u128,
        required: u128,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeCallbackError {
    #[error("fee recipient {recipient} reverted: {reason}")]
    Reverted { recipient: Address, reason: String },

    #[error("fee recipient {recipient} returned {returned}")]
    BadMagicValue { recipient: Address, returned: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("no bridge registered for source {0}")]
    UnknownSource(B256),

    #[error("bridge source {source_id} failed: {reason}")]
    Failed { source_id: B256, reason: String },

    #[error("bridge source {source_id} bought {bought}, below minimum {minimum}")]
    InsufficientOutput {
        source_id: B256,
        bought: u128,
        minimum: u128,
    },
}
