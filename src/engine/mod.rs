//! Fill engine.
//!
//! ## Components
//!
//! Leaf-first:
//!
//! 1. [`SignatureVerifier`]: the five signing modes
//! 2. [`OrderValidator`]: order status from stored state and the clock
//! 3. [`FillAmountCalculator`]: clamping and proration
//! 4. [`FeeAccountant`]: protocol fees, taker fees, NFT fee callbacks
//! 5. single-order pipelines for limit, RFQ, OTC and NFT orders
//! 6. [`BatchFillOrchestrator`]: best-effort or all-or-nothing batches
//! 7. [`QuoteFillEngine`]: heterogeneous legs toward one target
//!
//! [`Exchange`] ties them together behind transactional entry points.
//!
//! ## Rules
//!
//! - **Replay first**: filled amounts, nonces and bits are written before
//!   any asset moves or collaborator is called
//! - **Round down**: maker and fee amounts are floored per leg
//! - **All or nothing**: a failed call leaves no trace
//! - **No reentry**: one guarded entry point at a time
//!
//! ## Example
//!
//! ```
//! use fill_engine::engine::{CallContext, Exchange};
//! use fill_engine::config::EngineConfig;
//! use fill_engine::host::MemoryHost;
//! use fill_engine::ledger::MemoryStore;
//! use alloy_primitives::Address;
//!
//! let mut exchange = Exchange::new(EngineConfig::default(), MemoryStore::new(), MemoryHost::default()).unwrap();
//! let maker = Address::repeat_byte(1);
//!
//! // Cancelling the same OTC nonce range twice is harmless
//! exchange.cancel_by_nonce(CallContext::new(maker, 1_000), 0, 5).unwrap();
//! exchange.cancel_by_nonce(CallContext::new(maker, 1_000), 0, 5).unwrap();
//! assert_eq!(exchange.last_otc_nonce(maker, 0), 5);
//! ```

mod amounts;
mod batch;
mod context;
mod exchange;
mod fees;
mod frame;
mod guard;
mod native;
mod nft;
mod quote;
mod signature;
mod validator;

pub use amounts::{FillAmountCalculator, FillAmounts, Rounding};
pub use batch::{BatchFillOrchestrator, BatchFillOutcome, BatchSlot, FillOutcome};
pub use context::CallContext;
pub use exchange::{Exchange, PairCancellation, RelevantState};
pub use fees::FeeAccountant;
pub use frame::{Frame, ValueBudget};
pub use guard::{EntryPoint, GuardTicket, ReentrancyGuard};
pub use native::{fill_limit, fill_otc, fill_rfq, fill_taker_signed_otc, FillParties, FillResult};
pub use nft::{buy_nft, check_token_id, sell_nft};
pub use quote::{
    BridgeLeg, LegOutcome, QuoteFillEngine, QuoteLeg, QuoteOutcome, QuoteRequest, QuoteSide, QuoteWalk,
};
pub use signature::{presign, SignatureVerifier};
pub use validator::{classify, OrderValidator, StatusInputs};
