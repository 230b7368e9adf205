//! Storage keys.
//!
//! Every piece of persistent engine state is one 256-bit word under a
//! [`Slot`]. A zero word is indistinguishable from an absent one.

use alloy_primitives::{Address, B256, U256};

use crate::types::OrderKind;

/// Keyspace of a cancellation vector.
///
/// Order hashes and NFT nonces are both 256-bit words, so they never share
/// vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CancelSpace {
    /// Limit and RFQ orders, keyed by order hash
    OrderHash,
    /// NFT orders, keyed by maker nonce
    NftNonce,
}

impl CancelSpace {
    pub fn to_u8(self) -> u8 {
        match self {
            CancelSpace::OrderHash => 0,
            CancelSpace::NftNonce => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Cumulative filled amount of an order (taker units, or 1155 quantity)
    FilledAmount(B256),
    /// Highest consumed OTC nonce of `maker` in `bucket`
    OtcNonce { maker: Address, bucket: u64 },
    /// 256-bit cancellation vector of `maker` in `bucket` of `space`
    CancelBits {
        space: CancelSpace,
        maker: Address,
        bucket: U256,
    },
    /// Non-zero if the maker presigned the order hash
    PreSigned(B256),
    /// Non-zero if `signer` may sign and cancel for `maker`
    OrderSigner { maker: Address, signer: Address },
    /// Signature validator registered by a signer, stored as a word
    SignatureValidator(Address),
    /// Non-zero if `allowed` may act as transaction origin for `origin`
    AllowedOrigin { origin: Address, allowed: Address },
    /// Orders of this maker and pair with a lower salt are cancelled
    MinValidSalt {
        kind: OrderKind,
        maker: Address,
        maker_token: Address,
        taker_token: Address,
    },
}

impl Slot {
    /// Canonical byte encoding, used for state roots
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + 3 * 32);
        match self {
            Slot::FilledAmount(hash) => {
                out.push(0);
                out.extend_from_slice(hash.as_slice());
            }
            Slot::OtcNonce { maker, bucket } => {
                out.push(1);
                out.extend_from_slice(maker.as_slice());
                out.extend_from_slice(&bucket.to_be_bytes());
            }
            Slot::CancelBits { space, maker, bucket } => {
                out.push(2);
                out.push(space.to_u8());
                out.extend_from_slice(maker.as_slice());
                out.extend_from_slice(&bucket.to_be_bytes::<32>());
            }
            Slot::PreSigned(hash) => {
                out.push(3);
                out.extend_from_slice(hash.as_slice());
            }
            Slot::OrderSigner { maker, signer } => {
                out.push(4);
                out.extend_from_slice(maker.as_slice());
                out.extend_from_slice(signer.as_slice());
            }
            Slot::SignatureValidator(signer) => {
                out.push(5);
                out.extend_from_slice(signer.as_slice());
            }
            Slot::AllowedOrigin { origin, allowed } => {
                out.push(6);
                out.extend_from_slice(origin.as_slice());
                out.extend_from_slice(allowed.as_slice());
            }
            Slot::MinValidSalt {
                kind,
                maker,
                maker_token,
                taker_token,
            } => {
                out.push(7);
                out.push(kind.to_u8());
                out.extend_from_slice(maker.as_slice());
                out.extend_from_slice(maker_token.as_slice());
                out.extend_from_slice(taker_token.as_slice());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodings_are_distinct_across_variants() {
        let a = Slot::FilledAmount(B256::ZERO).encode();
        let b = Slot::PreSigned(B256::ZERO).encode();
        assert_ne!(a, b);
        assert_eq!(a.len(), 33);
    }

    #[test]
    fn test_pair_slot_keyed_by_kind() {
        let slot = |kind| Slot::MinValidSalt {
            kind,
            maker: Address::ZERO,
            maker_token: Address::ZERO,
            taker_token: Address::ZERO,
        };
        assert_ne!(slot(OrderKind::Limit), slot(OrderKind::Rfq));
        assert_ne!(slot(OrderKind::Limit).encode(), slot(OrderKind::Rfq).encode());
    }

    #[test]
    fn test_cancel_bits_keyed_by_space() {
        let slot = |space| Slot::CancelBits {
            space,
            maker: Address::ZERO,
            bucket: U256::from(7u8),
        };
        assert_ne!(slot(CancelSpace::OrderHash), slot(CancelSpace::NftNonce));
        assert_ne!(slot(CancelSpace::OrderHash).encode(), slot(CancelSpace::NftNonce).encode());
    }
}
