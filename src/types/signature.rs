//! Order signatures.
//!
//! ## Signing Modes
//!
//! | Tag | Mode            | Payload                        |
//! |-----|-----------------|--------------------------------|
//! | 2   | EIP-712         | v, r, s over the order hash    |
//! | 3   | EthSign         | v, r, s over the prefixed hash |
//! | 4   | PreSigned       | none                           |
//! | 5   | WalletDelegated | delegate + inner signature     |
//! | 6   | Validator       | opaque validator data          |

use alloy_primitives::{Address, B256};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::eip712::keccak256;
use crate::error::AuthorizationError;

/// Signature type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    Eip712,
    EthSign,
    PreSigned,
    WalletDelegated,
    Validator,
}

impl SignatureType {
    pub fn to_u8(self) -> u8 {
        match self {
            SignatureType::Eip712 => 2,
            SignatureType::EthSign => 3,
            SignatureType::PreSigned => 4,
            SignatureType::WalletDelegated => 5,
            SignatureType::Validator => 6,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            2 => Some(SignatureType::Eip712),
            3 => Some(SignatureType::EthSign),
            4 => Some(SignatureType::PreSigned),
            5 => Some(SignatureType::WalletDelegated),
            6 => Some(SignatureType::Validator),
            _ => None,
        }
    }
}

/// A recoverable secp256k1 signature with Ethereum-style `v` (27 or 28).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EcdsaSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl EcdsaSignature {
    /// Sign a 32-byte digest directly, without any further hashing.
    pub fn sign_digest(key: &SigningKey, digest: B256) -> Result<Self, k256::ecdsa::Error> {
        let (sig, recid) = key.sign_prehash_recoverable(digest.as_slice())?;
        let bytes = sig.to_bytes();
        Ok(Self {
            v: 27 + recid.to_byte(),
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..]),
        })
    }

    /// Recover the signing address of `digest`.
    pub fn recover(&self, digest: B256) -> Result<Address, AuthorizationError> {
        let recid = self
            .v
            .checked_sub(27)
            .and_then(RecoveryId::from_byte)
            .ok_or(AuthorizationError::MalformedSignature("v must be 27 or 28"))?;

        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(self.r.as_slice());
        rs[32..].copy_from_slice(self.s.as_slice());
        let sig = K256Signature::from_slice(&rs)
            .map_err(|_| AuthorizationError::MalformedSignature("r or s out of range"))?;

        let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recid)
            .map_err(|_| AuthorizationError::MalformedSignature("unrecoverable signature"))?;
        Ok(address_of(&key))
    }
}

/// Ethereum address of a public key: the last 20 bytes of keccak(x ‖ y).
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash.as_slice()[12..])
}

/// A signature over an order hash, in one of five modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signature {
    /// Signs the order hash directly
    Eip712(EcdsaSignature),
    /// Signs `keccak("\x19Ethereum Signed Message:\n32" ‖ hash)`
    EthSign(EcdsaSignature),
    /// The maker recorded the order hash ahead of time
    PreSigned,
    /// Signed by `delegate`, one of the maker's registered signers
    WalletDelegated {
        delegate: Address,
        inner: Box<Signature>,
    },
    /// Checked by the validator contract the maker registered
    Validator { data: Vec<u8> },
}

impl Signature {
    pub fn signature_type(&self) -> SignatureType {
        match self {
            Signature::Eip712(_) => SignatureType::Eip712,
            Signature::EthSign(_) => SignatureType::EthSign,
            Signature::PreSigned => SignatureType::PreSigned,
            Signature::WalletDelegated { .. } => SignatureType::WalletDelegated,
            Signature::Validator { .. } => SignatureType::Validator,
        }
    }

    /// EIP-712 signature over `order_hash`
    pub fn eip712(key: &SigningKey, order_hash: B256) -> Result<Self, k256::ecdsa::Error> {
        EcdsaSignature::sign_digest(key, order_hash).map(Signature::Eip712)
    }

    /// EthSign signature over `order_hash`
    pub fn eth_sign(key: &SigningKey, order_hash: B256) -> Result<Self, k256::ecdsa::Error> {
        EcdsaSignature::sign_digest(key, super::eip712::eth_sign_digest(order_hash))
            .map(Signature::EthSign)
    }

    /// Wrap a delegate's signature for a maker wallet
    pub fn delegated(delegate: Address, inner: Signature) -> Self {
        Signature::WalletDelegated {
            delegate,
            inner: Box::new(inner),
        }
    }
}
