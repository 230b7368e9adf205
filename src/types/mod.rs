//! Core data types for the fill engine
//!
//! ## Types
//!
//! - [`LimitOrder`], [`RfqOrder`], [`OtcOrder`]: fungible order families
//! - [`NftOrder`]: ERC-721 / ERC-1155 orders with fees and properties
//! - [`Signature`]: the five signing modes
//! - [`OrderStatus`] / [`OrderInfo`]: derived order state
//! - [`FillEvent`]: SSZ notification of one fill
//! - [`BatchReceipt`]: batch/quote summary
//!
//! ## Amounts
//!
//! Order amounts are `u128`. Products are taken in 256-bit space (see
//! [`amount`]) so proration never overflows.

mod fill;
mod nft;
mod order;
mod receipt;
mod signature;
pub mod amount;
pub mod eip712;

pub use fill::{address_bytes, FillEvent};
pub use nft::{Fee, NftKind, NftOrder, Property, TradeDirection};
pub use order::{
    LimitOrder, Order, OrderInfo, OrderKind, OrderStatus, OtcOrder, RfqOrder, NATIVE_TOKEN,
};
pub use receipt::BatchReceipt;
pub use signature::{address_of, EcdsaSignature, Signature, SignatureType};
pub use eip712::Eip712Domain;
