//! Replay protection.
//!
//! Two layouts share one store:
//!
//! - **OTC ratchet**: `(maker, bucket) -> highest consumed nonce`. A nonce is
//!   usable only if it is strictly above the stored value, and using it
//!   raises the stored value. The value never decreases.
//! - **Cancellation vectors**: `(space, maker, bucket) -> 256-bit vector`.
//!   Setting a bit is permanent and idempotent. Limit and RFQ orders map their
//!   hash to a [`CancelBit`] with [`hash_slot`]; NFT orders map their nonce
//!   with [`nonce_slot`]. The two live in separate [`CancelSpace`]s.

use alloy_primitives::{Address, B256, U256};

use super::slot::{CancelSpace, Slot};
use super::store::StateStore;
use crate::error::ReplayError;
use crate::types::amount::u256_to_u128;

/// One bit of a cancellation vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelBit {
    pub space: CancelSpace,
    pub bucket: U256,
    pub bit: u8,
}

/// Cancellation bit of an order hash: bucket is the top 248 bits, bit the low byte.
pub fn hash_slot(order_hash: B256) -> CancelBit {
    let word = U256::from_be_bytes(order_hash.0);
    CancelBit {
        space: CancelSpace::OrderHash,
        bucket: word >> 8,
        bit: order_hash.0[31],
    }
}

/// Cancellation bit of an NFT nonce: bucket `nonce >> 8`, bit `nonce & 0xff`.
pub fn nonce_slot(nonce: U256) -> CancelBit {
    CancelBit {
        space: CancelSpace::NftNonce,
        bucket: nonce >> 8,
        bit: (nonce.as_limbs()[0] & 0xff) as u8,
    }
}

/// Replay-state operations over any [`StateStore`].
pub trait NonceRegistry: StateStore {
    fn last_otc_nonce(&self, maker: Address, bucket: u64) -> u128 {
        u256_to_u128(self.load(&Slot::OtcNonce { maker, bucket })).unwrap_or(u128::MAX)
    }

    /// Consume `nonce`, failing if it does not exceed the stored value.
    fn consume_otc_nonce(&mut self, maker: Address, bucket: u64, nonce: u128) -> Result<(), ReplayError> {
        let stored = self.last_otc_nonce(maker, bucket);
        if nonce <= stored {
            return Err(ReplayError::StaleNonce {
                maker,
                bucket,
                nonce,
                stored,
            });
        }
        self.store(Slot::OtcNonce { maker, bucket }, U256::from(nonce));
        Ok(())
    }

    /// Raise the stored nonce to at least `nonce`; lower values are a no-op.
    ///
    /// Returns true if the stored value changed.
    fn advance_otc_nonce(&mut self, maker: Address, bucket: u64, nonce: u128) -> bool {
        if nonce <= self.last_otc_nonce(maker, bucket) {
            return false;
        }
        self.store(Slot::OtcNonce { maker, bucket }, U256::from(nonce));
        true
    }

    fn bit_vector(&self, space: CancelSpace, maker: Address, bucket: U256) -> U256 {
        self.load(&Slot::CancelBits { space, maker, bucket })
    }

    fn is_cancelled(&self, maker: Address, key: CancelBit) -> bool {
        self.bit_vector(key.space, maker, key.bucket).bit(key.bit as usize)
    }

    /// Set one cancellation bit. Returns true if the bit was newly set.
    fn cancel(&mut self, maker: Address, key: CancelBit) -> bool {
        let mut vector = self.bit_vector(key.space, maker, key.bucket);
        if vector.bit(key.bit as usize) {
            return false;
        }
        vector.set_bit(key.bit as usize, true);
        self.store(
            Slot::CancelBits {
                space: key.space,
                maker,
                bucket: key.bucket,
            },
            vector,
        );
        true
    }
}

impl<T: StateStore + ?Sized> NonceRegistry for T {}
