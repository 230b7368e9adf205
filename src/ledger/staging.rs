//! Layered write overlay for two-phase apply.
//!
//! A call computes all of its state changes into a [`Staged`] view over the
//! committed store. Nested scopes (one per batch item or quote leg) push a
//! layer with [`Staged::begin`] and either fold it into the layer below with
//! [`Staged::commit`] or drop it with [`Staged::rollback`]. Nothing reaches the
//! underlying store until the caller takes the writes with
//! [`Staged::into_writes`] and applies them.

use std::collections::BTreeMap;

use alloy_primitives::U256;

use super::slot::Slot;
use super::store::StateStore;

pub struct Staged<'s, S: StateStore + ?Sized> {
    base: &'s S,
    layers: Vec<BTreeMap<Slot, U256>>,
}

impl<'s, S: StateStore + ?Sized> Staged<'s, S> {
    pub fn new(base: &'s S) -> Self {
        Self {
            base,
            layers: vec![BTreeMap::new()],
        }
    }

    /// Number of open layers, including the root layer
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn begin(&mut self) {
        self.layers.push(BTreeMap::new());
    }

    /// Fold the top layer into the one below. The root layer is never popped.
    pub fn commit(&mut self) {
        if self.layers.len() < 2 {
            return;
        }
        if let Some(top) = self.layers.pop() {
            if let Some(below) = self.layers.last_mut() {
                below.extend(top);
            }
        }
    }

    /// Discard the top layer. The root layer is cleared instead of popped.
    pub fn rollback(&mut self) {
        if self.layers.len() < 2 {
            if let Some(root) = self.layers.last_mut() {
                root.clear();
            }
            return;
        }
        self.layers.pop();
    }

    /// Flatten every layer into the final set of writes.
    pub fn into_writes(self) -> BTreeMap<Slot, U256> {
        let mut writes = BTreeMap::new();
        for layer in self.layers {
            writes.extend(layer);
        }
        writes
    }
}

impl<'s, S: StateStore + ?Sized> StateStore for Staged<'s, S> {
    fn load(&self, slot: &Slot) -> U256 {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.get(slot) {
                return *value;
            }
        }
        self.base.load(slot)
    }

    fn store(&mut self, slot: Slot, value: U256) {
        if let Some(top) = self.layers.last_mut() {
            top.insert(slot, value);
        }
    }
}

/// Apply a set of staged writes to a store.
pub fn apply<S: StateStore + ?Sized>(store: &mut S, writes: BTreeMap<Slot, U256>) {
    for (slot, value) in writes {
        store.store(slot, value);
    }
}
