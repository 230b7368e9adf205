//! Entry-point reentrancy guard.
//!
//! Only one guarded entry point may execute at a time. The flag lives behind
//! an `Arc` so collaborators that call back into the engine observe the same
//! state as the exchange that invoked them.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::{EngineError, Result};

const IDLE: u8 = 0;

/// Guarded top-level operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Fill,
    BatchFill,
    QuoteFill,
    NftFill,
    Cancel,
    Register,
}

impl EntryPoint {
    fn to_u8(self) -> u8 {
        match self {
            EntryPoint::Fill => 1,
            EntryPoint::BatchFill => 2,
            EntryPoint::QuoteFill => 3,
            EntryPoint::NftFill => 4,
            EntryPoint::Cancel => 5,
            EntryPoint::Register => 6,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EntryPoint::Fill),
            2 => Some(EntryPoint::BatchFill),
            3 => Some(EntryPoint::QuoteFill),
            4 => Some(EntryPoint::NftFill),
            5 => Some(EntryPoint::Cancel),
            6 => Some(EntryPoint::Register),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryPoint::Fill => "fill",
            EntryPoint::BatchFill => "batch_fill",
            EntryPoint::QuoteFill => "quote_fill",
            EntryPoint::NftFill => "nft_fill",
            EntryPoint::Cancel => "cancel",
            EntryPoint::Register => "register",
        }
    }
}

/// Shared "currently executing" flag.
///
/// Cloning yields a handle onto the same flag.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    active: Arc<AtomicU8>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `entry` as executing until the returned ticket is dropped.
    pub fn enter(&self, entry: EntryPoint) -> Result<GuardTicket> {
        match self
            .active
            .compare_exchange(IDLE, entry.to_u8(), Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(GuardTicket {
                active: Arc::clone(&self.active),
            }),
            Err(current) => Err(EngineError::Reentrancy {
                active: EntryPoint::from_u8(current).map_or("unknown", EntryPoint::as_str),
                entered: entry.as_str(),
            }),
        }
    }

    pub fn active(&self) -> Option<EntryPoint> {
        EntryPoint::from_u8(self.active.load(Ordering::Acquire))
    }
}

/// Held for the duration of one entry point; releases the guard on drop.
#[derive(Debug)]
pub struct GuardTicket {
    active: Arc<AtomicU8>,
}

impl Drop for GuardTicket {
    fn drop(&mut self) {
        self.active.store(IDLE, Ordering::Release);
    }
}
