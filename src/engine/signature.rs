//! SignatureVerifier: checks that an order hash was authorized by a signer.
//!
//! One verification function per signing mode. Every failure is an
//! [`AuthorizationError`], never a silent `false`, so callers can tell "not
//! signed by the maker" apart from "not fillable".

use alloy_primitives::{Address, B256};

use crate::error::AuthorizationError;
use crate::host::SignatureValidators;
use crate::ledger::{OrderRegistry, StateStore};
use crate::types::eip712::eth_sign_digest;
use crate::types::{EcdsaSignature, Signature};

pub struct SignatureVerifier<'a, S: ?Sized, V: ?Sized> {
    state: &'a S,
    validators: &'a V,
}

impl<'a, S, V> SignatureVerifier<'a, S, V>
where
    S: StateStore + ?Sized,
    V: SignatureValidators + ?Sized,
{
    pub fn new(state: &'a S, validators: &'a V) -> Self {
        Self { state, validators }
    }

    /// Verify that `signature` authorizes `order_hash` on behalf of `expected_signer`.
    pub fn verify(
        &self,
        order_hash: B256,
        expected_signer: Address,
        signature: &Signature,
    ) -> Result<(), AuthorizationError> {
        match signature {
            Signature::Eip712(sig) => self.verify_ecdsa(order_hash, order_hash, expected_signer, sig),
            Signature::EthSign(sig) => {
                self.verify_ecdsa(order_hash, eth_sign_digest(order_hash), expected_signer, sig)
            }
            Signature::PreSigned => {
                if self.state.is_presigned(order_hash) {
                    Ok(())
                } else {
                    Err(AuthorizationError::InvalidSigner {
                        order_hash,
                        expected: expected_signer,
                    })
                }
            }
            Signature::WalletDelegated { delegate, inner } => {
                if matches!(**inner, Signature::WalletDelegated { .. }) {
                    return Err(AuthorizationError::NestedDelegation);
                }
                if !self.state.is_order_signer(expected_signer, *delegate) {
                    return Err(AuthorizationError::DelegateNotRegistered {
                        maker: expected_signer,
                        delegate: *delegate,
                    });
                }
                self.verify(order_hash, *delegate, inner)
            }
            Signature::Validator { data } => {
                let validator = self
                    .state
                    .signature_validator(expected_signer)
                    .ok_or(AuthorizationError::NoValidatorRegistered(expected_signer))?;
                if self
                    .validators
                    .is_valid_signature(validator, expected_signer, order_hash, data)
                {
                    Ok(())
                } else {
                    Err(AuthorizationError::ValidatorRejected {
                        signer: expected_signer,
                        validator,
                    })
                }
            }
        }
    }

    /// Non-failing form of [`SignatureVerifier::verify`], for queries
    pub fn is_valid(&self, order_hash: B256, expected_signer: Address, signature: &Signature) -> bool {
        self.verify(order_hash, expected_signer, signature).is_ok()
    }

    fn verify_ecdsa(
        &self,
        order_hash: B256,
        digest: B256,
        expected_signer: Address,
        sig: &EcdsaSignature,
    ) -> Result<(), AuthorizationError> {
        let recovered = sig.recover(digest)?;
        if recovered != expected_signer {
            return Err(AuthorizationError::InvalidSigner {
                order_hash,
                expected: expected_signer,
            });
        }
        Ok(())
    }
}

/// Record a presignature. Only the maker itself may presign its orders.
pub fn presign<S: StateStore + ?Sized>(
    state: &mut S,
    caller: Address,
    maker: Address,
    order_hash: B256,
) -> Result<(), AuthorizationError> {
    if caller != maker {
        return Err(AuthorizationError::OnlyMakerMayPresign { maker, caller });
    }
    state.set_presigned(order_hash);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::ledger::MemoryStore;
    use crate::types::address_of;
    use crate::types::eip712::keccak256;
    use k256::ecdsa::SigningKey;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    #[test]
    fn test_eip712_and_eth_sign() {
        let store = MemoryStore::new();
        let host = MemoryHost::default();
        let verifier = SignatureVerifier::new(&store, &host);

        let sk = key(1);
        let maker = address_of(sk.verifying_key());
        let hash = keccak256(b"order");

        verifier.verify(hash, maker, &Signature::eip712(&sk, hash).unwrap()).unwrap();
        verifier.verify(hash, maker, &Signature::eth_sign(&sk, hash).unwrap()).unwrap();

        // Modes are not interchangeable
        let Signature::Eip712(raw) = Signature::eip712(&sk, hash).unwrap() else { unreachable!() };
        assert!(!verifier.is_valid(hash, maker, &Signature::EthSign(raw)));
    }

    #[test]
    fn test_wrong_signer() {
        let store = MemoryStore::new();
        let host = MemoryHost::default();
        let verifier = SignatureVerifier::new(&store, &host);

        let hash = keccak256(b"order");
        let maker = address_of(key(1).verifying_key());
        let sig = Signature::eip712(&key(2), hash).unwrap();
        assert!(matches!(
            verifier.verify(hash, maker, &sig),
            Err(AuthorizationError::InvalidSigner { .. })
        ));
    }

    #[test]
    fn test_presigned() {
        let mut store = MemoryStore::new();
        let maker = Address::repeat_byte(1);
        let hash = keccak256(b"order");

        assert!(presign(&mut store, Address::repeat_byte(2), maker, hash).is_err());
        {
            let host = MemoryHost::default();
            assert!(!SignatureVerifier::new(&store, &host).is_valid(hash, maker, &Signature::PreSigned));
        }
        presign(&mut store, maker, maker, hash).unwrap();
        let host = MemoryHost::default();
        assert!(SignatureVerifier::new(&store, &host).is_valid(hash, maker, &Signature::PreSigned));
    }

    #[test]
    fn test_wallet_delegated_and_revocation() {
        let mut store = MemoryStore::new();
        let host = MemoryHost::default();
        let wallet = Address::repeat_byte(0x77);
        let delegate_key = key(5);
        let delegate = address_of(delegate_key.verifying_key());
        let hash = keccak256(b"order");
        let sig = Signature::delegated(delegate, Signature::eip712(&delegate_key, hash).unwrap());

        assert!(matches!(
            SignatureVerifier::new(&store, &host).verify(hash, wallet, &sig),
            Err(AuthorizationError::DelegateNotRegistered { .. })
        ));

        store.set_order_signer(wallet, delegate, true);
        SignatureVerifier::new(&store, &host).verify(hash, wallet, &sig).unwrap();

        store.set_order_signer(wallet, delegate, false);
        assert!(!SignatureVerifier::new(&store, &host).is_valid(hash, wallet, &sig));
    }

    #[test]
    fn test_nested_delegation_rejected() {
        let store = MemoryStore::new();
        let host = MemoryHost::default();
        let nested = Signature::delegated(
            Address::repeat_byte(1),
            Signature::delegated(Address::repeat_byte(2), Signature::PreSigned),
        );
        assert_eq!(
            SignatureVerifier::new(&store, &host).verify(B256::ZERO, Address::repeat_byte(3), &nested),
            Err(AuthorizationError::NestedDelegation)
        );
    }

    #[test]
    fn test_validator_mode() {
        let mut store = MemoryStore::new();
        let mut host = MemoryHost::default();
        let signer = Address::repeat_byte(0x11);
        let validator = Address::repeat_byte(0x22);
        let hash = keccak256(b"order");
        let sig = Signature::Validator { data: vec![1, 2, 3] };

        assert_eq!(
            SignatureVerifier::new(&store, &host).verify(hash, signer, &sig),
            Err(AuthorizationError::NoValidatorRegistered(signer))
        );

        store.set_signature_validator(signer, validator);
        assert!(matches!(
            SignatureVerifier::new(&store, &host).verify(hash, signer, &sig),
            Err(AuthorizationError::ValidatorRejected { .. })
        ));

        host.approve_signature(validator, hash);
        SignatureVerifier::new(&store, &host).verify(hash, signer, &sig).unwrap();
    }
}
