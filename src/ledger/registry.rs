//! Order bookkeeping: filled amounts, presignatures, delegated signers,
//! signature validators, allowed origins and pair cancellation floors.

use alloy_primitives::{Address, B256, U256};

use super::slot::Slot;
use super::store::StateStore;
use crate::types::amount::u256_to_u128;
use crate::types::OrderKind;

fn flag(set: bool) -> U256 {
    if set {
        U256::from(1u8)
    } else {
        U256::ZERO
    }
}

pub trait OrderRegistry: StateStore {
    fn filled_amount(&self, order_hash: B256) -> u128 {
        u256_to_u128(self.load(&Slot::FilledAmount(order_hash))).unwrap_or(u128::MAX)
    }

    fn set_filled_amount(&mut self, order_hash: B256, amount: u128) {
        self.store(Slot::FilledAmount(order_hash), U256::from(amount));
    }

    fn is_presigned(&self, order_hash: B256) -> bool {
        self.load(&Slot::PreSigned(order_hash)) != U256::ZERO
    }

    fn set_presigned(&mut self, order_hash: B256) {
        self.store(Slot::PreSigned(order_hash), flag(true));
    }

    fn is_order_signer(&self, maker: Address, signer: Address) -> bool {
        self.load(&Slot::OrderSigner { maker, signer }) != U256::ZERO
    }

    fn set_order_signer(&mut self, maker: Address, signer: Address, allowed: bool) {
        self.store(Slot::OrderSigner { maker, signer }, flag(allowed));
    }

    fn signature_validator(&self, signer: Address) -> Option<Address> {
        let word = self.load(&Slot::SignatureValidator(signer));
        if word == U256::ZERO {
            return None;
        }
        Some(Address::from_word(B256::from(word.to_be_bytes::<32>())))
    }

    /// Register (or with `Address::ZERO`, clear) the validator for `signer`
    fn set_signature_validator(&mut self, signer: Address, validator: Address) {
        self.store(
            Slot::SignatureValidator(signer),
            U256::from_be_slice(validator.as_slice()),
        );
    }

    fn is_allowed_origin(&self, origin: Address, allowed: Address) -> bool {
        self.load(&Slot::AllowedOrigin { origin, allowed }) != U256::ZERO
    }

    fn set_allowed_origin(&mut self, origin: Address, allowed: Address, is_allowed: bool) {
        self.store(Slot::AllowedOrigin { origin, allowed }, flag(is_allowed));
    }

    fn min_valid_salt(
        &self,
        kind: OrderKind,
        maker: Address,
        maker_token: Address,
        taker_token: Address,
    ) -> U256 {
        self.load(&Slot::MinValidSalt {
            kind,
            maker,
            maker_token,
            taker_token,
        })
    }

    /// Raise the pair's salt floor. A value at or below the current floor is
    /// ignored; returns true if the floor moved.
    fn raise_min_valid_salt(
        &mut self,
        kind: OrderKind,
        maker: Address,
        maker_token: Address,
        taker_token: Address,
        min_valid_salt: U256,
    ) -> bool {
        let current = self.min_valid_salt(kind, maker, maker_token, taker_token);
        if min_valid_salt <= current {
            return false;
        }
        self.store(
            Slot::MinValidSalt {
                kind,
                maker,
                maker_token,
                taker_token,
            },
            min_valid_salt,
        );
        true
    }
}

impl<T: StateStore + ?Sized> OrderRegistry for T {}
