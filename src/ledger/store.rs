//! Persistent key-value storage.

use std::collections::BTreeMap;

use alloy_primitives::U256;
use sha2::{Digest, Sha256};

use super::slot::Slot;

/// Word storage the engine reads and writes.
///
/// Absent slots read as zero. Implementations must make `store(slot, ZERO)`
/// equivalent to deleting the slot.
pub trait StateStore {
    fn load(&self, slot: &Slot) -> U256;

    fn store(&mut self, slot: Slot, value: U256);
}

/// In-memory store backed by a sorted map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    words: BTreeMap<Slot, U256>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-zero slots
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// SHA-256 over every `(slot, word)` pair in key order.
    ///
    /// Two stores with the same contents always have the same root.
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for (slot, word) in &self.words {
            hasher.update(slot.encode());
            hasher.update(word.to_be_bytes::<32>());
        }
        let mut root = [0u8; 32];
        root.copy_from_slice(&hasher.finalize());
        root
    }

    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }
}

impl StateStore for MemoryStore {
    fn load(&self, slot: &Slot) -> U256 {
        self.words.get(slot).copied().unwrap_or(U256::ZERO)
    }

    fn store(&mut self, slot: Slot, value: U256) {
        if value == U256::ZERO {
            self.words.remove(&slot);
        } else {
            self.words.insert(slot, value);
        }
    }
}
