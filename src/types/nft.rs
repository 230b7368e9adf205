//! NFT orders (ERC-721 and ERC-1155).
//!
//! An NFT order trades one NFT leg against one ERC-20 leg. A `SellNft` order
//! is a maker offering a specific token; a `BuyNft` order is a maker bidding
//! for a token, optionally for any token id satisfying a list of property
//! predicates.
//!
//! ## Fees
//!
//! Fees are always paid by the NFT buyer in the ERC-20 token. For ERC-1155
//! partial fills they are prorated with the same ratio as the ERC-20 leg.
//!
//! ## Replay
//!
//! NFT orders carry an explicit `nonce`. Filling or cancelling an order sets
//! bit `nonce & 0xff` of the maker's vector in bucket `nonce >> 8`.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use super::eip712::{keccak256, Eip712Domain, StructHasher};
use super::order::OrderKind;

const FEE_TYPE: &[u8] = b"Fee(address recipient,uint256 amount,bytes feeData)";
const PROPERTY_TYPE: &[u8] = b"Property(address propertyValidator,bytes propertyData)";

pub const ERC721_ORDER_TYPE: &[u8] = b"ERC721Order(uint8 direction,address maker,address taker,uint256 expiry,uint256 nonce,address erc20Token,uint256 erc20TokenAmount,Fee[] fees,address erc721Token,uint256 erc721TokenId,Property[] erc721TokenProperties)Fee(address recipient,uint256 amount,bytes feeData)Property(address propertyValidator,bytes propertyData)";

pub const ERC1155_ORDER_TYPE: &[u8] = b"ERC1155Order(uint8 direction,address maker,address taker,uint256 expiry,uint256 nonce,address erc20Token,uint256 erc20TokenAmount,Fee[] fees,address erc1155Token,uint256 erc1155TokenId,Property[] erc1155TokenProperties,uint128 erc1155TokenAmount)Fee(address recipient,uint256 amount,bytes feeData)Property(address propertyValidator,bytes propertyData)";

/// Which side of the trade the maker's NFT leg is on.
///
/// - SellNft = 0
/// - BuyNft = 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TradeDirection {
    #[default]
    SellNft,
    BuyNft,
}

impl TradeDirection {
    pub fn to_u8(self) -> u8 {
        match self {
            TradeDirection::SellNft => 0,
            TradeDirection::BuyNft => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TradeDirection::SellNft),
            1 => Some(TradeDirection::BuyNft),
            _ => None,
        }
    }
}

/// A fee owed by the NFT buyer to `recipient`.
///
/// A non-empty `fee_data` makes the recipient a callback target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fee {
    pub recipient: Address,
    pub amount: U256,
    pub fee_data: Vec<u8>,
}

impl Fee {
    pub fn struct_hash(&self) -> B256 {
        StructHasher::new(FEE_TYPE)
            .address(self.recipient)
            .uint(self.amount)
            .bytes(&self.fee_data)
            .finish()
    }
}

/// A predicate the delivered token must satisfy.
///
/// A zero validator accepts any token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Property {
    pub property_validator: Address,
    pub property_data: Vec<u8>,
}

impl Property {
    pub fn struct_hash(&self) -> B256 {
        StructHasher::new(PROPERTY_TYPE)
            .address(self.property_validator)
            .bytes(&self.property_data)
            .finish()
    }
}

/// ERC-721 or ERC-1155
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NftKind {
    #[default]
    Erc721,
    Erc1155,
}

/// An NFT order.
///
/// `nft_amount` is the fillable ERC-1155 quantity; it is always 1 for
/// ERC-721 orders and does not take part in their hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NftOrder {
    pub kind: NftKind,
    pub direction: TradeDirection,
    pub maker: Address,
    pub taker: Address,
    pub expiry: U256,
    pub nonce: U256,
    pub erc20_token: Address,
    pub erc20_token_amount: U256,
    pub fees: Vec<Fee>,
    pub nft_token: Address,
    pub nft_token_id: U256,
    pub nft_token_properties: Vec<Property>,
    pub nft_amount: u128,
}

impl NftOrder {
    pub fn struct_hash(&self) -> B256 {
        let fee_hashes: Vec<B256> = self.fees.iter().map(Fee::struct_hash).collect();
        let property_hashes: Vec<B256> = self
            .nft_token_properties
            .iter()
            .map(Property::struct_hash)
            .collect();

        let type_string = match self.kind {
            NftKind::Erc721 => ERC721_ORDER_TYPE,
            NftKind::Erc1155 => ERC1155_ORDER_TYPE,
        };
        let hasher = StructHasher::with_typehash(keccak256(type_string))
            .u8(self.direction.to_u8())
            .address(self.maker)
            .address(self.taker)
            .uint(self.expiry)
            .uint(self.nonce)
            .address(self.erc20_token)
            .uint(self.erc20_token_amount)
            .array(&fee_hashes)
            .address(self.nft_token)
            .uint(self.nft_token_id)
            .array(&property_hashes);

        match self.kind {
            NftKind::Erc721 => hasher.finish(),
            NftKind::Erc1155 => hasher.u128(self.nft_amount).finish(),
        }
    }

    pub fn hash(&self, domain: &Eip712Domain) -> B256 {
        domain.hash_struct(self.struct_hash())
    }

    pub fn order_kind(&self) -> OrderKind {
        match self.kind {
            NftKind::Erc721 => OrderKind::Erc721,
            NftKind::Erc1155 => OrderKind::Erc1155,
        }
    }

    /// Fillable NFT quantity
    pub fn capacity(&self) -> u128 {
        match self.kind {
            NftKind::Erc721 => 1,
            NftKind::Erc1155 => self.nft_amount,
        }
    }

    pub fn is_sell(&self) -> bool {
        self.direction == TradeDirection::SellNft
    }

    /// Sum of all fee amounts, saturating at `U256::MAX`
    pub fn total_fees(&self) -> U256 {
        self.fees
            .iter()
            .fold(U256::ZERO, |acc, fee| acc.saturating_add(fee.amount))
    }
}
