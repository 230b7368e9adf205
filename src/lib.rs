//! # Fill Engine
//!
//! Order-fill engine for a peer-to-peer exchange protocol.
//!
//! ## Architecture
//!
//! - **Types**: orders, signatures, status, fill events, receipts, EIP-712 hashing
//! - **Ledger**: injected persistent store, staging overlay, replay registries
//! - **Host**: collaborator traits for transfers, fees, bridges and callbacks
//! - **Engine**: validation, proration, fees, single/batch/quote fills
//!
//! ## Design Principles
//!
//! 1. **Determinism**: identical calls against identical state produce
//!    identical writes, events and receipts
//! 2. **Integer Math**: amounts are `u128`, products are taken in 256 bits,
//!    rounding is always explicit
//! 3. **Transactional Calls**: every entry point applies fully or not at all
//! 4. **Synchronous Execution**: no async; the host serializes calls

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: orders, signatures, events, receipts
pub mod types;

/// Persistent state: store trait, staging, nonce and order registries
pub mod ledger;

/// External collaborators and the in-memory host
pub mod host;

/// Fill engine: validation, pipelines, batch and quote orchestration
pub mod engine;

/// Error taxonomy
pub mod error;

/// Engine configuration
pub mod config;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::EngineConfig;
pub use engine::{CallContext, Exchange, FillResult};
pub use error::{EngineError, Result};
pub use types::{LimitOrder, NftOrder, Order, OrderInfo, OrderStatus, OtcOrder, RfqOrder, Signature};
