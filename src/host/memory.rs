//! In-memory host.
//!
//! Balances live in one sorted map keyed by `(asset, owner)`. Every balance
//! change is journaled so a failed call can be unwound to a checkpoint.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, B256, U256};
use tracing::debug;

use super::{
    Asset, AssetLedger, BridgeCall, BridgeExecutor, Checkpoint, FeeCallbacks, Journal,
    PropertyValidators, ProtocolFees, SignatureValidators, FEE_CALLBACK_MAGIC,
};
use crate::engine::{EntryPoint, ReentrancyGuard};
use crate::error::{BridgeError, FeeCallbackError, TransferError};
use crate::types::amount::mul_div_floor;
use crate::types::NATIVE_TOKEN;

/// How a registered fee recipient answers its callback
#[derive(Debug, Clone)]
pub enum CallbackBehavior {
    Accept,
    WrongMagic,
    Revert(String),
    /// Try to re-enter the exchange through its guard
    Reenter(ReentrancyGuard, EntryPoint),
}

/// A scripted bridge source: sells at `rate_num / rate_den` out of `pool`.
#[derive(Debug, Clone)]
pub struct BridgeBehavior {
    pub pool: Address,
    pub rate_num: u128,
    pub rate_den: u128,
    pub failure: Option<String>,
}

type BalanceKey = (Asset, Address);

#[derive(Debug, Clone)]
pub struct MemoryHost {
    balances: BTreeMap<BalanceKey, u128>,
    journal: Vec<(BalanceKey, u128)>,
    gas_price: u128,
    fee_collector: Address,
    bridges: BTreeMap<B256, BridgeBehavior>,
    callbacks: BTreeMap<Address, CallbackBehavior>,
    approved_signatures: BTreeSet<(Address, B256)>,
    approved_properties: BTreeSet<(Address, U256)>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(Address::repeat_byte(0xfe))
    }
}

impl MemoryHost {
    pub fn new(fee_collector: Address) -> Self {
        Self {
            balances: BTreeMap::new(),
            journal: Vec::new(),
            gas_price: 0,
            fee_collector,
            bridges: BTreeMap::new(),
            callbacks: BTreeMap::new(),
            approved_signatures: BTreeSet::new(),
            approved_properties: BTreeSet::new(),
        }
    }

    pub fn fee_collector(&self) -> Address {
        self.fee_collector
    }

    pub fn set_gas_price(&mut self, gas_price: u128) {
        self.gas_price = gas_price;
    }

    /// Credit `amount` without journaling (test and demo setup)
    pub fn mint(&mut self, asset: Asset, owner: Address, amount: u128) {
        let entry = self.balances.entry((asset, owner)).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn mint_token(&mut self, token: Address, owner: Address, amount: u128) {
        self.mint(Asset::Fungible(token), owner, amount);
    }

    pub fn mint_native(&mut self, owner: Address, amount: u128) {
        self.mint(Asset::Fungible(NATIVE_TOKEN), owner, amount);
    }

    pub fn token_balance(&self, token: Address, owner: Address) -> u128 {
        self.balance_of(&Asset::Fungible(token), owner)
    }

    pub fn register_bridge(&mut self, source: B256, behavior: BridgeBehavior) {
        self.bridges.insert(source, behavior);
    }

    pub fn register_fee_callback(&mut self, recipient: Address, behavior: CallbackBehavior) {
        self.callbacks.insert(recipient, behavior);
    }

    pub fn approve_signature(&mut self, validator: Address, hash: B256) {
        self.approved_signatures.insert((validator, hash));
    }

    pub fn revoke_signature(&mut self, validator: Address, hash: B256) {
        self.approved_signatures.remove(&(validator, hash));
    }

    pub fn approve_property(&mut self, validator: Address, token_id: U256) {
        self.approved_properties.insert((validator, token_id));
    }

    fn set_balance(&mut self, key: BalanceKey, value: u128) {
        let previous = self.balances.get(&key).copied().unwrap_or(0);
        self.journal.push((key.clone(), previous));
        if value == 0 {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, value);
        }
    }
}

impl AssetLedger for MemoryHost {
    fn transfer(&mut self, asset: &Asset, from: Address, to: Address, amount: u128) -> Result<(), TransferError> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                asset: asset.to_string(),
                owner: from,
                available,
                required: amount,
            });
        }
        let received = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("balance overflow".into()))?;

        self.set_balance((asset.clone(), from), available - amount);
        self.set_balance((asset.clone(), to), received);
        debug!(%asset, %from, %to, amount, "transfer");
        Ok(())
    }

    fn balance_of(&self, asset: &Asset, owner: Address) -> u128 {
        self.balances
            .get(&(asset.clone(), owner))
            .copied()
            .unwrap_or(0)
    }
}

impl ProtocolFees for MemoryHost {
    fn protocol_fee_amount(&self, multiplier: u32) -> u128 {
        self.gas_price.saturating_mul(multiplier as u128)
    }

    fn collect_protocol_fee(&mut self, payer: Address, amount: u128) -> Result<(), TransferError> {
        let collector = self.fee_collector;
        self.transfer(&Asset::Fungible(NATIVE_TOKEN), payer, collector, amount)
    }
}

impl BridgeExecutor for MemoryHost {
    fn execute_bridge(&mut self, call: &BridgeCall) -> Result<u128, BridgeError> {
        let behavior = self
            .bridges
            .get(&call.source)
            .cloned()
            .ok_or(BridgeError::UnknownSource(call.source))?;

        if let Some(reason) = behavior.failure {
            return Err(BridgeError::Failed {
                source_id: call.source,
                reason,
            });
        }

        let bought = mul_div_floor(call.sell_amount, behavior.rate_num, behavior.rate_den).ok_or_else(|| {
            BridgeError::Failed {
                source_id: call.source,
                reason: "bad rate".into(),
            }
        })?;
        if bought < call.min_buy_amount {
            return Err(BridgeError::InsufficientOutput {
                source_id: call.source,
                bought,
                minimum: call.min_buy_amount,
            });
        }

        let failed = |err: TransferError| BridgeError::Failed {
            source_id: call.source,
            reason: err.to_string(),
        };
        self.transfer(&Asset::Fungible(call.sell_token), call.payer, behavior.pool, call.sell_amount)
            .map_err(failed)?;
        self.transfer(&Asset::Fungible(call.buy_token), behavior.pool, call.recipient, bought)
            .map_err(failed)?;
        Ok(bought)
    }
}

impl FeeCallbacks for MemoryHost {
    fn on_fee_received(
        &mut self,
        recipient: Address,
        _token: Address,
        _amount: u128,
        _fee_data: &[u8],
    ) -> Result<[u8; 4], FeeCallbackError> {
        match self.callbacks.get(&recipient) {
            None | Some(CallbackBehavior::Accept) => Ok(FEE_CALLBACK_MAGIC),
            Some(CallbackBehavior::WrongMagic) => Ok([0xde, 0xad, 0xbe, 0xef]),
            Some(CallbackBehavior::Revert(reason)) => Err(FeeCallbackError::Reverted {
                recipient,
                reason: reason.clone(),
            }),
            Some(CallbackBehavior::Reenter(guard, entry)) => match guard.enter(*entry) {
                Ok(_ticket) => Ok(FEE_CALLBACK_MAGIC),
                Err(err) => Err(FeeCallbackError::Reverted {
                    recipient,
                    reason: err.to_string(),
                }),
            },
        }
    }
}

impl SignatureValidators for MemoryHost {
    fn is_valid_signature(&self, validator: Address, _signer: Address, hash: B256, _data: &[u8]) -> bool {
        self.approved_signatures.contains(&(validator, hash))
    }
}

impl PropertyValidators for MemoryHost {
    fn validate_property(&self, validator: Address, _token: Address, token_id: U256, _property_data: &[u8]) -> bool {
        self.approved_properties.contains(&(validator, token_id))
    }
}

impl Journal for MemoryHost {
    fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            if let Some((key, previous)) = self.journal.pop() {
                if previous == 0 {
                    self.balances.remove(&key);
                } else {
                    self.balances.insert(key, previous);
                }
            }
        }
    }

    fn release(&mut self, checkpoint: Checkpoint) {
        // Only the outermost checkpoint may forget history
        if checkpoint.0 == 0 {
            self.journal.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ALICE: Address = address!("a000000000000000000000000000000000000001");
    const BOB: Address = address!("b000000000000000000000000000000000000002");
    const TOKEN: Address = address!("7000000000000000000000000000000000000007");

    #[test]
    fn test_transfer_moves_balance() {
        let mut host = MemoryHost::default();
        host.mint_token(TOKEN, ALICE, 100);
        host.transfer(&Asset::Fungible(TOKEN), ALICE, BOB, 40).unwrap();
        assert_eq!(host.token_balance(TOKEN, ALICE), 60);
        assert_eq!(host.token_balance(TOKEN, BOB), 40);
    }

    #[test]
    fn test_insufficient_balance() {
        let mut host = MemoryHost::default();
        host.mint_token(TOKEN, ALICE, 10);
        let err = host.transfer(&Asset::Fungible(TOKEN), ALICE, BOB, 11).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientBalance { available: 10, required: 11, .. }));
    }

    #[test]
    fn test_revert_to_checkpoint() {
        let mut host = MemoryHost::default();
        host.mint_token(TOKEN, ALICE, 100);

        let cp = host.checkpoint();
        host.transfer(&Asset::Fungible(TOKEN), ALICE, BOB, 30).unwrap();
        let inner = host.checkpoint();
        host.transfer(&Asset::Fungible(TOKEN), ALICE, BOB, 30).unwrap();
        host.revert_to(inner);
        assert_eq!(host.token_balance(TOKEN, BOB), 30);

        host.revert_to(cp);
        assert_eq!(host.token_balance(TOKEN, ALICE), 100);
        assert_eq!(host.token_balance(TOKEN, BOB), 0);
    }

    #[test]
    fn test_bridge_rate_and_failure() {
        let mut host = MemoryHost::default();
        let pool = address!("9000000000000000000000000000000000000009");
        let buy = address!("8000000000000000000000000000000000000008");
        host.mint_token(TOKEN, ALICE, 100);
        host.mint_token(buy, pool, 1_000);
        host.register_bridge(
            B256::repeat_byte(1),
            BridgeBehavior { pool, rate_num: 2, rate_den: 1, failure: None },
        );

        let call = BridgeCall {
            source: B256::repeat_byte(1),
            sell_token: TOKEN,
            buy_token: buy,
            sell_amount: 50,
            min_buy_amount: 0,
            payer: ALICE,
            recipient: BOB,
            data: vec![],
        };
        assert_eq!(host.execute_bridge(&call).unwrap(), 100);
        assert_eq!(host.token_balance(buy, BOB), 100);

        let unknown = BridgeCall { source: B256::repeat_byte(2), ..call };
        assert!(matches!(host.execute_bridge(&unknown), Err(BridgeError::UnknownSource(_))));
    }

    #[test]
    fn test_callback_behaviors() {
        let mut host = MemoryHost::default();
        assert_eq!(host.on_fee_received(ALICE, TOKEN, 1, b"x").unwrap(), FEE_CALLBACK_MAGIC);

        host.register_fee_callback(ALICE, CallbackBehavior::WrongMagic);
        assert_ne!(host.on_fee_received(ALICE, TOKEN, 1, b"x").unwrap(), FEE_CALLBACK_MAGIC);

        host.register_fee_callback(BOB, CallbackBehavior::Revert("nope".into()));
        assert!(host.on_fee_received(BOB, TOKEN, 1, b"x").is_err());
    }
}
