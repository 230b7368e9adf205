//! The exchange: every public operation of the engine.
//!
//! ## Transactions
//!
//! Each mutating call runs as one transaction:
//!
//! 1. enter the reentrancy guard
//! 2. checkpoint the host journal
//! 3. move attached value into the exchange
//! 4. run the operation against a staged view of the store
//! 5. refund unspent value
//! 6. on success apply the staged writes, keep the host movements and
//!    publish the fill events; on failure revert the host to the checkpoint
//!
//! A failed call leaves the store, the host balances and the event log exactly
//! as they were.
//!
//! ## Example
//!
//! ```
//! use fill_engine::config::EngineConfig;
//! use fill_engine::engine::Exchange;
//! use fill_engine::host::MemoryHost;
//! use fill_engine::ledger::MemoryStore;
//! use fill_engine::types::{LimitOrder, OrderStatus};
//!
//! let exchange = Exchange::new(EngineConfig::default(), MemoryStore::new(), MemoryHost::default()).unwrap();
//! let info = exchange.get_limit_order_info(&LimitOrder::default(), 0);
//! assert_eq!(info.status, OrderStatus::Invalid);
//! ```

use alloy_primitives::{Address, B256, U256};
use tracing::{debug, info, warn};

use super::batch::{BatchFillOrchestrator, BatchFillOutcome, BatchSlot};
use super::context::CallContext;
use super::frame::Frame;
use super::guard::{EntryPoint, ReentrancyGuard};
use super::native::{fill_limit, fill_otc, fill_rfq, fill_taker_signed_otc, FillParties, FillResult};
use super::nft::{buy_nft, sell_nft};
use super::quote::{QuoteFillEngine, QuoteOutcome, QuoteRequest};
use super::signature::{presign, SignatureVerifier};
use super::validator::OrderValidator;
use crate::config::EngineConfig;
use crate::error::{AuthorizationError, CapacityError, RestrictionError, Result};
use crate::host::{Asset, AssetLedger, Host, Journal};
use crate::ledger::{apply, hash_slot, nonce_slot, CancelSpace, NonceRegistry, OrderRegistry, StateStore};
use crate::types::amount::mul_div_floor;
use crate::types::{
    BatchReceipt, Eip712Domain, FillEvent, LimitOrder, NftKind, NftOrder, Order, OrderInfo,
    OrderKind, OrderStatus, OtcOrder, RfqOrder, Signature,
};

/// An order's info together with what could actually be filled right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevantState {
    pub info: OrderInfo,
    /// Taker amount fillable now, bounded by the maker's balance
    pub actual_fillable_taker_amount: u128,
    pub is_signature_valid: bool,
}

/// One pair-cancellation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCancellation {
    pub maker_token: Address,
    pub taker_token: Address,
    pub min_valid_salt: U256,
}

pub struct Exchange<S: StateStore, H: Host> {
    config: EngineConfig,
    domain: Eip712Domain,
    store: S,
    host: H,
    guard: ReentrancyGuard,
    events: Vec<FillEvent>,
    batch_seq: u64,
}

fn require_maker_or_signer<S: StateStore + ?Sized>(state: &S, maker: Address, caller: Address) -> Result<()> {
    if caller != maker && !state.is_order_signer(maker, caller) {
        return Err(AuthorizationError::OnlyMakerMayCancel { maker, caller }.into());
    }
    Ok(())
}

fn reject_value(ctx: &CallContext) -> Result<()> {
    if ctx.value > 0 {
        return Err(RestrictionError::ValueNotAccepted.into());
    }
    Ok(())
}

fn cancel_order_bit<S: StateStore + ?Sized>(
    state: &mut S,
    caller: Address,
    maker: Address,
    order_hash: B256,
) -> Result<()> {
    require_maker_or_signer(state, maker, caller)?;
    let newly = state.cancel(maker, hash_slot(order_hash));
    info!(%maker, %order_hash, newly, "order cancelled");
    Ok(())
}

impl<S: StateStore, H: Host> Exchange<S, H> {
    pub fn new(config: EngineConfig, store: S, host: H) -> Result<Self> {
        config.validate()?;
        let domain = config.domain();
        Ok(Self {
            config,
            domain,
            store,
            host,
            guard: ReentrancyGuard::new(),
            events: Vec::new(),
            batch_seq: 0,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct host access, for funding accounts between calls
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Handle onto the entry guard, shared with collaborators that call back in
    pub fn guard(&self) -> ReentrancyGuard {
        self.guard.clone()
    }

    /// Every fill event committed so far, in order
    pub fn events(&self) -> &[FillEvent] {
        &self.events
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    fn transact<T>(
        &mut self,
        entry: EntryPoint,
        ctx: CallContext,
        body: impl FnOnce(&mut Frame<'_, S, H>) -> Result<T>,
    ) -> Result<T> {
        let _ticket = self.guard.enter(entry)?;
        let checkpoint = self.host.checkpoint();

        let mut frame = Frame::new(&self.store, &mut self.host, &self.domain, &self.config, ctx);
        let outcome = frame
            .pull_value()
            .and_then(|()| body(&mut frame))
            .and_then(|value| frame.refund_value().map(|_| value));

        match outcome {
            Ok(value) => {
                let Frame { state, events, .. } = frame;
                let writes = state.into_writes();
                apply(&mut self.store, writes);
                self.host.release(checkpoint);
                self.events.extend(events);
                Ok(value)
            }
            Err(err) => {
                drop(frame);
                self.host.revert_to(checkpoint);
                debug!(entry = entry.as_str(), kind = err.kind(), %err, "call reverted");
                Err(err)
            }
        }
    }

    fn receipt(&mut self, processed: usize, first_event: usize, timestamp: u64) -> BatchReceipt {
        self.batch_seq += 1;
        let events = self.events.get(first_event..).unwrap_or(&[]);
        BatchReceipt::from_events(self.batch_seq, processed as u64, events, timestamp)
    }

    fn validator(&self, now: u64) -> OrderValidator<'_, S> {
        OrderValidator::new(&self.store, &self.domain, now)
    }

    // ========================================================================
    // Hashes and info
    // ========================================================================

    pub fn get_limit_order_hash(&self, order: &LimitOrder) -> B256 {
        order.hash(&self.domain)
    }

    pub fn get_rfq_order_hash(&self, order: &RfqOrder) -> B256 {
        order.hash(&self.domain)
    }

    pub fn get_otc_order_hash(&self, order: &OtcOrder) -> B256 {
        order.hash(&self.domain)
    }

    pub fn get_nft_order_hash(&self, order: &NftOrder) -> B256 {
        order.hash(&self.domain)
    }

    pub fn get_limit_order_info(&self, order: &LimitOrder, now: u64) -> OrderInfo {
        self.validator(now).limit_info(order)
    }

    pub fn get_rfq_order_info(&self, order: &RfqOrder, now: u64) -> OrderInfo {
        self.validator(now).rfq_info(order)
    }

    pub fn get_otc_order_info(&self, order: &OtcOrder, now: u64) -> OrderInfo {
        self.validator(now).otc_info(order)
    }

    /// Status of any fungible order. Pure read.
    pub fn get_order_status(&self, order: &Order, now: u64) -> OrderInfo {
        self.validator(now).order_info(order)
    }

    pub fn get_erc721_order_status(&self, order: &NftOrder, now: u64) -> OrderStatus {
        self.validator(now).nft_info(order).status
    }

    pub fn get_erc1155_order_info(&self, order: &NftOrder, now: u64) -> OrderInfo {
        self.validator(now).nft_info(order)
    }

    pub fn last_otc_nonce(&self, maker: Address, bucket: u64) -> u128 {
        self.store.last_otc_nonce(maker, bucket)
    }

    /// The maker's NFT nonce bits for `bucket` (nonces `bucket << 8 ..`)
    pub fn get_nft_order_status_bit_vector(&self, maker: Address, bucket: U256) -> U256 {
        self.store.bit_vector(CancelSpace::NftNonce, maker, bucket)
    }

    pub fn is_valid_order_signer(&self, maker: Address, signer: Address) -> bool {
        self.store.is_order_signer(maker, signer)
    }

    pub fn validate_nft_order_signature(&self, order: &NftOrder, signature: &Signature) -> Result<()> {
        let order_hash = order.hash(&self.domain);
        SignatureVerifier::new(&self.store, &self.host).verify(order_hash, order.maker, signature)?;
        Ok(())
    }

    // ========================================================================
    // Relevant state
    // ========================================================================

    fn relevant_state(
        &self,
        info: OrderInfo,
        maker: Address,
        maker_token: Address,
        maker_amount: u128,
        taker_amount: u128,
        signature: &Signature,
    ) -> RelevantState {
        let is_signature_valid =
            SignatureVerifier::new(&self.store, &self.host).is_valid(info.order_hash, maker, signature);

        let actual_fillable_taker_amount = if info.status == OrderStatus::Fillable {
            let remaining = taker_amount.saturating_sub(info.filled_amount);
            let balance = self.host.balance_of(&Asset::Fungible(maker_token), maker);
            let funded = mul_div_floor(balance, taker_amount, maker_amount).unwrap_or(u128::MAX);
            remaining.min(funded)
        } else {
            0
        };

        RelevantState {
            info,
            actual_fillable_taker_amount,
            is_signature_valid,
        }
    }

    pub fn get_limit_order_relevant_state(
        &self,
        order: &LimitOrder,
        signature: &Signature,
        now: u64,
    ) -> RelevantState {
        self.relevant_state(
            self.get_limit_order_info(order, now),
            order.maker,
            order.maker_token,
            order.maker_amount,
            order.taker_amount,
            signature,
        )
    }

    pub fn get_rfq_order_relevant_state(
        &self,
        order: &RfqOrder,
        signature: &Signature,
        now: u64,
    ) -> RelevantState {
        self.relevant_state(
            self.get_rfq_order_info(order, now),
            order.maker,
            order.maker_token,
            order.maker_amount,
            order.taker_amount,
            signature,
        )
    }

    pub fn batch_get_limit_order_relevant_states(
        &self,
        orders: &[LimitOrder],
        signatures: &[Signature],
        now: u64,
    ) -> Result<Vec<RelevantState>> {
        BatchFillOrchestrator::check_shape(orders.len(), signatures.len(), orders.len(), usize::MAX)?;
        Ok(orders
            .iter()
            .zip(signatures)
            .map(|(order, signature)| self.get_limit_order_relevant_state(order, signature, now))
            .collect())
    }

    pub fn batch_get_rfq_order_relevant_states(
        &self,
        orders: &[RfqOrder],
        signatures: &[Signature],
        now: u64,
    ) -> Result<Vec<RelevantState>> {
        BatchFillOrchestrator::check_shape(orders.len(), signatures.len(), orders.len(), usize::MAX)?;
        Ok(orders
            .iter()
            .zip(signatures)
            .map(|(order, signature)| self.get_rfq_order_relevant_state(order, signature, now))
            .collect())
    }

    // ========================================================================
    // Single fills
    // ========================================================================

    /// Fill up to `taker_amount` of a limit order.
    ///
    /// Attached value pays the protocol fee; the rest is refunded.
    ///
    /// # Arguments
    ///
    /// * `ctx` - caller, origin, timestamp and attached value
    /// * `order` - the signed order
    /// * `signature` - maker authorization
    /// * `taker_amount` - taker-token amount to fill, clamped to what remains
    pub fn fill_limit_order(
        &mut self,
        ctx: CallContext,
        order: &LimitOrder,
        signature: &Signature,
        taker_amount: u128,
    ) -> Result<FillResult> {
        let parties = FillParties::direct(ctx.sender);
        self.transact(EntryPoint::Fill, ctx, |frame| {
            fill_limit(frame, order, signature, taker_amount, parties)
        })
    }

    pub fn fill_rfq_order(
        &mut self,
        ctx: CallContext,
        order: &RfqOrder,
        signature: &Signature,
        taker_amount: u128,
    ) -> Result<FillResult> {
        reject_value(&ctx)?;
        let parties = FillParties::direct(ctx.sender);
        self.transact(EntryPoint::Fill, ctx, |frame| {
            fill_rfq(frame, order, signature, taker_amount, parties)
        })
    }

    pub fn fill_otc_order(
        &mut self,
        ctx: CallContext,
        order: &OtcOrder,
        signature: &Signature,
        taker_amount: u128,
    ) -> Result<FillResult> {
        reject_value(&ctx)?;
        let parties = FillParties::direct(ctx.sender);
        self.transact(EntryPoint::Fill, ctx, |frame| {
            fill_otc(frame, order, signature, taker_amount, parties)
        })
    }

    /// Fill exactly `taker_amount` or nothing.
    pub fn fill_or_kill_limit_order(
        &mut self,
        ctx: CallContext,
        order: &LimitOrder,
        signature: &Signature,
        taker_amount: u128,
    ) -> Result<FillResult> {
        let parties = FillParties::direct(ctx.sender);
        self.transact(EntryPoint::Fill, ctx, |frame| {
            let result = fill_limit(frame, order, signature, taker_amount, parties)?;
            require_exact(taker_amount, result)
        })
    }

    pub fn fill_or_kill_rfq_order(
        &mut self,
        ctx: CallContext,
        order: &RfqOrder,
        signature: &Signature,
        taker_amount: u128,
    ) -> Result<FillResult> {
        reject_value(&ctx)?;
        let parties = FillParties::direct(ctx.sender);
        self.transact(EntryPoint::Fill, ctx, |frame| {
            let result = fill_rfq(frame, order, signature, taker_amount, parties)?;
            require_exact(taker_amount, result)
        })
    }

    /// Fill a whole OTC order on behalf of a taker that signed it.
    ///
    /// The caller is typically a relayer whose transaction origin the order's
    /// `tx_origin` registered.
    pub fn fill_taker_signed_otc_order(
        &mut self,
        ctx: CallContext,
        order: &OtcOrder,
        maker_signature: &Signature,
        taker_signature: &Signature,
    ) -> Result<FillResult> {
        reject_value(&ctx)?;
        self.transact(EntryPoint::Fill, ctx, |frame| {
            fill_taker_signed_otc(frame, order, maker_signature, taker_signature)
        })
    }

    // ========================================================================
    // Batch fills
    // ========================================================================

    pub fn batch_fill_limit_orders(
        &mut self,
        ctx: CallContext,
        orders: &[LimitOrder],
        signatures: &[Signature],
        taker_amounts: &[u128],
        revert_if_incomplete: bool,
    ) -> Result<BatchFillOutcome> {
        BatchFillOrchestrator::check_shape(
            orders.len(),
            signatures.len(),
            taker_amounts.len(),
            self.config.max_batch_size,
        )?;
        let slots: Vec<BatchSlot> = orders
            .iter()
            .zip(taker_amounts)
            .map(|(order, &requested)| BatchSlot {
                order_hash: order.hash(&self.domain),
                requested,
            })
            .collect();

        let parties = FillParties::direct(ctx.sender);
        let first_event = self.events.len();
        let outcomes = self.transact(EntryPoint::BatchFill, ctx, |frame| {
            BatchFillOrchestrator::fill_many(frame, &slots, revert_if_incomplete, |f, i| {
                fill_limit(f, &orders[i], &signatures[i], taker_amounts[i], parties)
            })
        })?;
        let receipt = self.receipt(outcomes.len(), first_event, ctx.timestamp);
        Ok(BatchFillOutcome { outcomes, receipt })
    }

    pub fn batch_fill_rfq_orders(
        &mut self,
        ctx: CallContext,
        orders: &[RfqOrder],
        signatures: &[Signature],
        taker_amounts: &[u128],
        revert_if_incomplete: bool,
    ) -> Result<BatchFillOutcome> {
        reject_value(&ctx)?;
        BatchFillOrchestrator::check_shape(
            orders.len(),
            signatures.len(),
            taker_amounts.len(),
            self.config.max_batch_size,
        )?;
        let slots: Vec<BatchSlot> = orders
            .iter()
            .zip(taker_amounts)
            .map(|(order, &requested)| BatchSlot {
                order_hash: order.hash(&self.domain),
                requested,
            })
            .collect();

        let parties = FillParties::direct(ctx.sender);
        let first_event = self.events.len();
        let outcomes = self.transact(EntryPoint::BatchFill, ctx, |frame| {
            BatchFillOrchestrator::fill_many(frame, &slots, revert_if_incomplete, |f, i| {
                fill_rfq(f, &orders[i], &signatures[i], taker_amounts[i], parties)
            })
        })?;
        let receipt = self.receipt(outcomes.len(), first_event, ctx.timestamp);
        Ok(BatchFillOutcome { outcomes, receipt })
    }

    /// Fill taker-signed OTC orders, skipping any that fail.
    pub fn batch_fill_taker_signed_otc_orders(
        &mut self,
        ctx: CallContext,
        orders: &[OtcOrder],
        maker_signatures: &[Signature],
        taker_signatures: &[Signature],
    ) -> Result<BatchFillOutcome> {
        reject_value(&ctx)?;
        BatchFillOrchestrator::check_shape(
            orders.len(),
            maker_signatures.len(),
            taker_signatures.len(),
            self.config.max_batch_size,
        )?;
        let slots: Vec<BatchSlot> = orders
            .iter()
            .map(|order| BatchSlot {
                order_hash: order.hash(&self.domain),
                requested: order.taker_amount,
            })
            .collect();

        let first_event = self.events.len();
        let outcomes = self.transact(EntryPoint::BatchFill, ctx, |frame| {
            BatchFillOrchestrator::fill_many(frame, &slots, false, |f, i| {
                fill_taker_signed_otc(f, &orders[i], &maker_signatures[i], &taker_signatures[i])
            })
        })?;
        let receipt = self.receipt(outcomes.len(), first_event, ctx.timestamp);
        Ok(BatchFillOutcome { outcomes, receipt })
    }

    // ========================================================================
    // NFT fills
    // ========================================================================

    /// Sell an ERC-721 token into a maker's bid.
    pub fn sell_erc721(
        &mut self,
        ctx: CallContext,
        order: &NftOrder,
        signature: &Signature,
        token_id: U256,
    ) -> Result<FillResult> {
        reject_value(&ctx)?;
        self.transact(EntryPoint::NftFill, ctx, |frame| {
            sell_nft(frame, NftKind::Erc721, order, signature, token_id, 1)
        })
    }

    pub fn sell_erc1155(
        &mut self,
        ctx: CallContext,
        order: &NftOrder,
        signature: &Signature,
        token_id: U256,
        quantity: u128,
    ) -> Result<FillResult> {
        reject_value(&ctx)?;
        self.transact(EntryPoint::NftFill, ctx, |frame| {
            sell_nft(frame, NftKind::Erc1155, order, signature, token_id, quantity)
        })
    }

    /// Buy the ERC-721 token a maker offers. Native-priced offers are paid
    /// from attached value.
    pub fn buy_erc721(&mut self, ctx: CallContext, order: &NftOrder, signature: &Signature) -> Result<FillResult> {
        self.transact(EntryPoint::NftFill, ctx, |frame| {
            buy_nft(frame, NftKind::Erc721, order, signature, 1)
        })
    }

    pub fn buy_erc1155(
        &mut self,
        ctx: CallContext,
        order: &NftOrder,
        signature: &Signature,
        quantity: u128,
    ) -> Result<FillResult> {
        self.transact(EntryPoint::NftFill, ctx, |frame| {
            buy_nft(frame, NftKind::Erc1155, order, signature, quantity)
        })
    }

    pub fn batch_buy_erc721s(
        &mut self,
        ctx: CallContext,
        orders: &[NftOrder],
        signatures: &[Signature],
        revert_if_incomplete: bool,
    ) -> Result<BatchFillOutcome> {
        BatchFillOrchestrator::check_shape(
            orders.len(),
            signatures.len(),
            orders.len(),
            self.config.max_batch_size,
        )?;
        let slots: Vec<BatchSlot> = orders
            .iter()
            .map(|order| BatchSlot {
                order_hash: order.hash(&self.domain),
                requested: 1,
            })
            .collect();

        let first_event = self.events.len();
        let outcomes = self.transact(EntryPoint::NftFill, ctx, |frame| {
            BatchFillOrchestrator::fill_many(frame, &slots, revert_if_incomplete, |f, i| {
                buy_nft(f, NftKind::Erc721, &orders[i], &signatures[i], 1)
            })
        })?;
        let receipt = self.receipt(outcomes.len(), first_event, ctx.timestamp);
        Ok(BatchFillOutcome { outcomes, receipt })
    }

    pub fn batch_buy_erc1155s(
        &mut self,
        ctx: CallContext,
        orders: &[NftOrder],
        signatures: &[Signature],
        quantities: &[u128],
        revert_if_incomplete: bool,
    ) -> Result<BatchFillOutcome> {
        BatchFillOrchestrator::check_shape(
            orders.len(),
            signatures.len(),
            quantities.len(),
            self.config.max_batch_size,
        )?;
        let slots: Vec<BatchSlot> = orders
            .iter()
            .zip(quantities)
            .map(|(order, &requested)| BatchSlot {
                order_hash: order.hash(&self.domain),
                requested,
            })
            .collect();

        let first_event = self.events.len();
        let outcomes = self.transact(EntryPoint::NftFill, ctx, |frame| {
            BatchFillOrchestrator::fill_many(frame, &slots, revert_if_incomplete, |f, i| {
                buy_nft(f, NftKind::Erc1155, &orders[i], &signatures[i], quantities[i])
            })
        })?;
        let receipt = self.receipt(outcomes.len(), first_event, ctx.timestamp);
        Ok(BatchFillOutcome { outcomes, receipt })
    }

    // ========================================================================
    // Quote fills
    // ========================================================================

    /// Walk `request.legs` toward the request's target.
    pub fn fill_quote(&mut self, ctx: CallContext, request: &QuoteRequest) -> Result<QuoteOutcome> {
        let max = self.config.max_batch_size;
        if request.legs.len() > max {
            return Err(CapacityError::BatchTooLarge {
                len: request.legs.len(),
                max,
            }
            .into());
        }

        let first_event = self.events.len();
        let walk = self.transact(EntryPoint::QuoteFill, ctx, |frame| {
            QuoteFillEngine::execute(frame, request)
        })?;
        info!(sold = walk.sold, bought = walk.bought, legs = walk.legs.len(), "quote filled");
        let receipt = self.receipt(request.legs.len(), first_event, ctx.timestamp);
        Ok(QuoteOutcome {
            sold: walk.sold,
            bought: walk.bought,
            legs: walk.legs,
            receipt,
        })
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Cancel a limit order. The maker or one of its registered signers may
    /// cancel; cancelling twice is a no-op.
    pub fn cancel_limit_order(&mut self, ctx: CallContext, order: &LimitOrder) -> Result<()> {
        let order_hash = order.hash(&self.domain);
        let maker = order.maker;
        self.transact(EntryPoint::Cancel, ctx, |frame| {
            cancel_order_bit(&mut frame.state, frame.ctx.sender, maker, order_hash)
        })
    }

    pub fn cancel_rfq_order(&mut self, ctx: CallContext, order: &RfqOrder) -> Result<()> {
        let order_hash = order.hash(&self.domain);
        let maker = order.maker;
        self.transact(EntryPoint::Cancel, ctx, |frame| {
            cancel_order_bit(&mut frame.state, frame.ctx.sender, maker, order_hash)
        })
    }

    pub fn batch_cancel_limit_orders(&mut self, ctx: CallContext, orders: &[LimitOrder]) -> Result<()> {
        let targets: Vec<(Address, B256)> = orders
            .iter()
            .map(|order| (order.maker, order.hash(&self.domain)))
            .collect();
        self.transact(EntryPoint::Cancel, ctx, |frame| {
            for (maker, order_hash) in targets {
                cancel_order_bit(&mut frame.state, frame.ctx.sender, maker, order_hash)?;
            }
            Ok(())
        })
    }

    pub fn batch_cancel_rfq_orders(&mut self, ctx: CallContext, orders: &[RfqOrder]) -> Result<()> {
        let targets: Vec<(Address, B256)> = orders
            .iter()
            .map(|order| (order.maker, order.hash(&self.domain)))
            .collect();
        self.transact(EntryPoint::Cancel, ctx, |frame| {
            for (maker, order_hash) in targets {
                cancel_order_bit(&mut frame.state, frame.ctx.sender, maker, order_hash)?;
            }
            Ok(())
        })
    }

    fn cancel_pairs(
        &mut self,
        ctx: CallContext,
        kind: OrderKind,
        maker: Address,
        pairs: &[PairCancellation],
    ) -> Result<()> {
        self.transact(EntryPoint::Cancel, ctx, |frame| {
            require_maker_or_signer(&frame.state, maker, frame.ctx.sender)?;
            for pair in pairs {
                let raised = frame.state.raise_min_valid_salt(
                    kind,
                    maker,
                    pair.maker_token,
                    pair.taker_token,
                    pair.min_valid_salt,
                );
                info!(
                    %maker,
                    kind = kind.as_str(),
                    maker_token = %pair.maker_token,
                    taker_token = %pair.taker_token,
                    min_valid_salt = %pair.min_valid_salt,
                    raised,
                    "pair orders cancelled"
                );
            }
            Ok(())
        })
    }

    /// Cancel every limit order of `maker` on the pair whose salt is below
    /// `min_valid_salt`. A floor below the current one is ignored.
    pub fn cancel_pair_limit_orders(
        &mut self,
        ctx: CallContext,
        maker: Address,
        maker_token: Address,
        taker_token: Address,
        min_valid_salt: U256,
    ) -> Result<()> {
        let pair = PairCancellation {
            maker_token,
            taker_token,
            min_valid_salt,
        };
        self.cancel_pairs(ctx, OrderKind::Limit, maker, &[pair])
    }

    pub fn cancel_pair_rfq_orders(
        &mut self,
        ctx: CallContext,
        maker: Address,
        maker_token: Address,
        taker_token: Address,
        min_valid_salt: U256,
    ) -> Result<()> {
        let pair = PairCancellation {
            maker_token,
            taker_token,
            min_valid_salt,
        };
        self.cancel_pairs(ctx, OrderKind::Rfq, maker, &[pair])
    }

    pub fn batch_cancel_pair_limit_orders(
        &mut self,
        ctx: CallContext,
        maker: Address,
        pairs: &[PairCancellation],
    ) -> Result<()> {
        self.cancel_pairs(ctx, OrderKind::Limit, maker, pairs)
    }

    pub fn batch_cancel_pair_rfq_orders(
        &mut self,
        ctx: CallContext,
        maker: Address,
        pairs: &[PairCancellation],
    ) -> Result<()> {
        self.cancel_pairs(ctx, OrderKind::Rfq, maker, pairs)
    }

    /// Invalidate every OTC order of the caller in `bucket` with a nonce up to
    /// and including `nonce`. Never lowers the stored nonce.
    pub fn cancel_by_nonce(&mut self, ctx: CallContext, bucket: u64, nonce: u128) -> Result<()> {
        self.transact(EntryPoint::Cancel, ctx, |frame| {
            let maker = frame.ctx.sender;
            let advanced = frame.state.advance_otc_nonce(maker, bucket, nonce);
            info!(%maker, bucket, nonce, advanced, "otc nonce cancelled");
            Ok(())
        })
    }

    /// Cancel the caller's NFT order with `nonce`. Idempotent.
    pub fn cancel_nft_order(&mut self, ctx: CallContext, nonce: U256) -> Result<()> {
        self.batch_cancel_nft_orders(ctx, &[nonce])
    }

    pub fn batch_cancel_nft_orders(&mut self, ctx: CallContext, nonces: &[U256]) -> Result<()> {
        self.transact(EntryPoint::Cancel, ctx, |frame| {
            let maker = frame.ctx.sender;
            for &nonce in nonces {
                let newly = frame.state.cancel(maker, nonce_slot(nonce));
                info!(%maker, %nonce, newly, "nft order cancelled");
            }
            Ok(())
        })
    }

    // ========================================================================
    // Presignatures and registrations
    // ========================================================================

    /// Presign a fungible order. Only its maker may do so.
    pub fn pre_sign_order(&mut self, ctx: CallContext, order: &Order) -> Result<()> {
        let order_hash = order.hash(&self.domain);
        let maker = order.maker();
        self.transact(EntryPoint::Register, ctx, |frame| {
            presign(&mut frame.state, frame.ctx.sender, maker, order_hash)?;
            info!(%maker, %order_hash, "order presigned");
            Ok(())
        })
    }

    pub fn pre_sign_nft_order(&mut self, ctx: CallContext, order: &NftOrder) -> Result<()> {
        let order_hash = order.hash(&self.domain);
        let maker = order.maker;
        self.transact(EntryPoint::Register, ctx, |frame| {
            presign(&mut frame.state, frame.ctx.sender, maker, order_hash)?;
            info!(%maker, %order_hash, "nft order presigned");
            Ok(())
        })
    }

    /// Allow or revoke `signer` as a delegate of the caller.
    pub fn register_allowed_order_signer(&mut self, ctx: CallContext, signer: Address, allowed: bool) -> Result<()> {
        self.transact(EntryPoint::Register, ctx, |frame| {
            let maker = frame.ctx.sender;
            frame.state.set_order_signer(maker, signer, allowed);
            info!(%maker, %signer, allowed, "order signer registered");
            Ok(())
        })
    }

    /// Register the predicate contract that judges the caller's
    /// validator-mode signatures. The zero address unregisters.
    pub fn register_signature_validator(&mut self, ctx: CallContext, validator: Address) -> Result<()> {
        self.transact(EntryPoint::Register, ctx, |frame| {
            let signer = frame.ctx.sender;
            frame.state.set_signature_validator(signer, validator);
            info!(%signer, %validator, "signature validator registered");
            Ok(())
        })
    }

    /// Let `origins` fill RFQ and OTC orders bound to the caller's origin.
    pub fn register_allowed_rfq_origins(
        &mut self,
        ctx: CallContext,
        origins: &[Address],
        allowed: bool,
    ) -> Result<()> {
        if ctx.sender != ctx.tx_origin {
            warn!(sender = %ctx.sender, tx_origin = %ctx.tx_origin, "origin registration from contract");
            return Err(RestrictionError::OnlyOriginMayRegister.into());
        }
        self.transact(EntryPoint::Register, ctx, |frame| {
            let origin = frame.ctx.tx_origin;
            for &allowed_origin in origins {
                frame.state.set_allowed_origin(origin, allowed_origin, allowed);
                info!(%origin, %allowed_origin, allowed, "rfq origin registered");
            }
            Ok(())
        })
    }
}

fn require_exact(requested: u128, result: FillResult) -> Result<FillResult> {
    if result.taker_filled != requested {
        return Err(CapacityError::FillOrKillFailed {
            requested,
            filled: result.taker_filled,
        }
        .into());
    }
    Ok(result)
}

// ============================================================================
// Unit Tests
// ============================================================================
