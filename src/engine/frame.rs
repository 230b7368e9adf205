//! Per-call execution frame.
//!
//! A [`Frame`] bundles everything one top-level call works with: the staged
//! state overlay, the host, the signing domain, the call context, the attached
//! native value still unspent, and the fill events emitted so far.
//!
//! [`Frame::atomically`] runs a sub-step (one batch item, one quote leg) so
//! that its state writes, asset movements, events and value spending are all
//! undone together if it fails.

use alloy_primitives::Address;
use tracing::info;

use super::context::CallContext;
use super::signature::SignatureVerifier;
use super::validator::OrderValidator;
use crate::config::EngineConfig;
use crate::error::{Result, SettlementError, TransferError};
use crate::host::{Asset, Host};
use crate::ledger::{StateStore, Staged};
use crate::types::{Eip712Domain, FillEvent};

/// Native value attached to the call and not yet spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueBudget {
    remaining: u128,
}

impl ValueBudget {
    pub fn new(value: u128) -> Self {
        Self { remaining: value }
    }

    pub fn remaining(&self) -> u128 {
        self.remaining
    }

    pub fn spend(&mut self, amount: u128, owner: Address) -> std::result::Result<(), TransferError> {
        if amount > self.remaining {
            return Err(TransferError::InsufficientBalance {
                asset: "attached value".into(),
                owner,
                available: self.remaining,
                required: amount,
            });
        }
        self.remaining -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: u128) {
        self.remaining = self.remaining.saturating_add(amount);
    }

    fn take_all(&mut self) -> u128 {
        std::mem::take(&mut self.remaining)
    }
}

pub struct Frame<'x, S: StateStore + ?Sized, H: Host + ?Sized> {
    pub state: Staged<'x, S>,
    pub host: &'x mut H,
    pub domain: &'x Eip712Domain,
    pub config: &'x EngineConfig,
    pub ctx: CallContext,
    pub budget: ValueBudget,
    pub events: Vec<FillEvent>,
}

impl<'x, S: StateStore + ?Sized, H: Host + ?Sized> Frame<'x, S, H> {
    pub fn new(
        store: &'x S,
        host: &'x mut H,
        domain: &'x Eip712Domain,
        config: &'x EngineConfig,
        ctx: CallContext,
    ) -> Self {
        Self {
            state: Staged::new(store),
            host,
            domain,
            config,
            ctx,
            budget: ValueBudget::default(),
            events: Vec::new(),
        }
    }

    /// The exchange account: holds attached value and quote escrow
    pub fn exchange(&self) -> Address {
        self.config.verifying_contract
    }

    pub fn validator(&self) -> OrderValidator<'_, Staged<'x, S>> {
        OrderValidator::new(&self.state, self.domain, self.ctx.timestamp)
    }

    pub fn verifier(&self) -> SignatureVerifier<'_, Staged<'x, S>, H> {
        SignatureVerifier::new(&self.state, &*self.host)
    }

    /// Run `step` so that it either fully applies or leaves no trace.
    pub fn atomically<T>(&mut self, step: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.state.begin();
        let checkpoint = self.host.checkpoint();
        let events_len = self.events.len();
        let budget = self.budget;

        match step(self) {
            Ok(value) => {
                self.state.commit();
                self.host.release(checkpoint);
                Ok(value)
            }
            Err(err) => {
                self.state.rollback();
                self.host.revert_to(checkpoint);
                self.events.truncate(events_len);
                self.budget = budget;
                Err(err)
            }
        }
    }

    pub fn transfer(&mut self, asset: &Asset, from: Address, to: Address, amount: u128) -> Result<()> {
        self.host
            .transfer(asset, from, to, amount)
            .map_err(|err| SettlementError::from(err).into())
    }

    /// Pay `amount` of `token` from `payer` to `to`.
    ///
    /// Native-asset payments by anyone but the exchange itself are drawn from
    /// the attached value, which the exchange already holds.
    pub fn pay(&mut self, token: Address, payer: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let exchange = self.exchange();
        if token == self.config.native_token && payer != exchange {
            self.budget
                .spend(amount, payer)
                .map_err(SettlementError::from)?;
            return self.transfer(&Asset::Fungible(token), exchange, to, amount);
        }
        self.transfer(&Asset::Fungible(token), payer, to, amount)
    }

    /// Move the attached value from the caller into the exchange.
    pub fn pull_value(&mut self) -> Result<()> {
        let value = self.ctx.value;
        if value == 0 {
            return Ok(());
        }
        let native = Asset::Fungible(self.config.native_token);
        let (sender, exchange) = (self.ctx.sender, self.exchange());
        self.transfer(&native, sender, exchange, value)?;
        self.budget = ValueBudget::new(value);
        Ok(())
    }

    /// Return whatever attached value was not spent. Returns the refunded amount.
    pub fn refund_value(&mut self) -> Result<u128> {
        let unspent = self.budget.take_all();
        if unspent > 0 {
            let native = Asset::Fungible(self.config.native_token);
            let (exchange, sender) = (self.exchange(), self.ctx.sender);
            self.transfer(&native, exchange, sender, unspent)?;
            info!(%sender, refunded = unspent, "refunded unspent value");
        }
        Ok(unspent)
    }

    pub fn emit(&mut self, event: FillEvent) {
        info!(
            order_hash = %event.order_hash(),
            kind = event.kind().map_or("unknown", |k| k.as_str()),
            maker = %event.maker(),
            taker = %event.taker(),
            maker_filled = event.maker_token_filled_amount,
            taker_filled = event.taker_token_filled_amount,
            fee_filled = event.fee_filled_amount,
            "order filled"
        );
        self.events.push(event);
    }
}
