//! EIP-712 typed-data hashing.
//!
//! Order hashes are `keccak256(0x19 0x01 ‖ domainSeparator ‖ structHash)`.
//! Each field of a struct is encoded as one left-padded 32-byte word; dynamic
//! `bytes` are replaced by their keccak, and arrays of structs by the keccak of
//! the concatenated member struct hashes.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

const DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Domain name all order hashes are bound to
pub const DOMAIN_NAME: &str = "ZeroEx";

/// Domain version all order hashes are bound to
pub const DOMAIN_VERSION: &str = "1.0.0";

/// Keccak-256 of `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    let out = Keccak256::digest(data.as_ref());
    B256::from_slice(&out)
}

/// Digest signed by an `eth_sign` style signature over `hash`.
pub fn eth_sign_digest(hash: B256) -> B256 {
    let mut h = Keccak256::new();
    h.update(b"\x19Ethereum Signed Message:\n32");
    h.update(hash.as_slice());
    B256::from_slice(&h.finalize())
}

/// The signing domain: exchange name/version plus chain and contract binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// Exchange domain for the given chain and contract
    pub fn exchange(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> B256 {
        StructHasher::new(DOMAIN_TYPE)
            .bytes32(keccak256(self.name.as_bytes()))
            .bytes32(keccak256(self.version.as_bytes()))
            .uint(U256::from(self.chain_id))
            .address(self.verifying_contract)
            .finish()
    }

    /// Final typed-data hash of a struct under this domain.
    pub fn hash_struct(&self, struct_hash: B256) -> B256 {
        let mut h = Keccak256::new();
        h.update([0x19, 0x01]);
        h.update(self.separator().as_slice());
        h.update(struct_hash.as_slice());
        B256::from_slice(&h.finalize())
    }
}

/// Incremental struct hasher: typehash first, then one 32-byte word per field.
pub struct StructHasher {
    inner: Keccak256,
}

impl StructHasher {
    pub fn new(type_string: &[u8]) -> Self {
        Self::with_typehash(keccak256(type_string))
    }

    pub fn with_typehash(typehash: B256) -> Self {
        let mut inner = Keccak256::new();
        inner.update(typehash.as_slice());
        Self { inner }
    }

    fn word(mut self, word: [u8; 32]) -> Self {
        self.inner.update(word);
        self
    }

    pub fn address(self, value: Address) -> Self {
        let mut buf = [0u8; 32];
        buf[12..].copy_from_slice(value.as_slice());
        self.word(buf)
    }

    pub fn uint(self, value: U256) -> Self {
        self.word(value.to_be_bytes::<32>())
    }

    pub fn u128(self, value: u128) -> Self {
        let mut buf = [0u8; 32];
        buf[16..].copy_from_slice(&value.to_be_bytes());
        self.word(buf)
    }

    pub fn u64(self, value: u64) -> Self {
        let mut buf = [0u8; 32];
        buf[24..].copy_from_slice(&value.to_be_bytes());
        self.word(buf)
    }

    pub fn u8(self, value: u8) -> Self {
        let mut buf = [0u8; 32];
        buf[31] = value;
        self.word(buf)
    }

    pub fn bytes32(self, value: B256) -> Self {
        self.word(value.0)
    }

    /// Dynamic `bytes` field: encoded as its keccak.
    pub fn bytes(self, value: &[u8]) -> Self {
        self.bytes32(keccak256(value))
    }

    /// Array of structs: encoded as the keccak of the concatenated member hashes.
    pub fn array(self, member_hashes: &[B256]) -> Self {
        let mut h = Keccak256::new();
        for member in member_hashes {
            h.update(member.as_slice());
        }
        self.bytes32(B256::from_slice(&h.finalize()))
    }

    pub fn finish(self) -> B256 {
        B256::from_slice(&self.inner.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            keccak256([]),
            b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn test_address_word_is_left_padded() {
        let a = address!("1111111111111111111111111111111111111111");
        let padded = {
            let mut buf = [0u8; 32];
            buf[12..].copy_from_slice(a.as_slice());
            buf
        };
        let via_hasher = StructHasher::with_typehash(B256::ZERO).address(a).finish();

        let mut manual = Keccak256::new();
        manual.update([0u8; 32]);
        manual.update(padded);
        assert_eq!(via_hasher, B256::from_slice(&manual.finalize()));
    }

    #[test]
    fn test_narrow_uints_match_u256_words() {
        let a = StructHasher::with_typehash(B256::ZERO)
            .u8(7)
            .u64(9)
            .u128(11)
            .finish();
        let b = StructHasher::with_typehash(B256::ZERO)
            .uint(U256::from(7u8))
            .uint(U256::from(9u8))
            .uint(U256::from(11u8))
            .finish();
        assert_eq!(a, b);
    }

    #[test]
    fn test_domain_separator_depends_on_chain() {
        let contract = address!("def1c0ded9bec7f1a1670819833240f027b25eff");
        let mainnet = Eip712Domain::exchange(1, contract);
        let other = Eip712Domain::exchange(3, contract);
        assert_ne!(mainnet.separator(), other.separator());
        assert_eq!(mainnet.separator(), Eip712Domain::exchange(1, contract).separator());
    }

    #[test]
    fn test_eth_sign_digest_differs_from_hash() {
        let h = keccak256(b"order");
        assert_ne!(eth_sign_digest(h), h);
    }
}
