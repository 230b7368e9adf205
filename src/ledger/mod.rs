//! Persistent engine state.
//!
//! The engine never owns a database. It reads and writes 256-bit words
//! through the [`StateStore`] trait, and layers typed operations on top:
//!
//! - [`NonceRegistry`]: OTC nonce ratchets and cancellation bit vectors
//! - [`OrderRegistry`]: filled amounts, presignatures, signers, origins
//!
//! Every mutating call works on a [`Staged`] overlay and only applies its
//! writes to the store once the whole call has succeeded.

mod nonce;
mod registry;
mod slot;
mod staging;
mod store;

pub use nonce::{hash_slot, nonce_slot, CancelBit, NonceRegistry};
pub use registry::OrderRegistry;
pub use slot::{CancelSpace, Slot};
pub use staging::{apply, Staged};
pub use store::{MemoryStore, StateStore};
