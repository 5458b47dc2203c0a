//! Per-user asset ledger
//!
//! Each user maps asset symbols to a `balance`/`locked` pair of scaled
//! integers with the invariant `locked <= balance`. These operations are
//! the only primitives for value movement; the engine composes them and is
//! responsible for ordering unlocks before debits so the invariant holds
//! at every step.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use types::errors::EngineError;

/// Balance columns for a single asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub balance: U256,
    pub locked: U256,
}

impl AssetBalance {
    /// Spendable portion: `balance - locked`
    pub fn available(&self) -> U256 {
        self.balance.saturating_sub(self.locked)
    }
}

/// The engine's internal ledger
///
/// Entries are created lazily on first credit and never destroyed.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: HashMap<Address, HashMap<String, AssetBalance>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to a user unconditionally, creating the entry if missing
    pub fn add_balance(
        &mut self,
        user: Address,
        asset: &str,
        amount: U256,
    ) -> Result<(), EngineError> {
        let entry = self
            .accounts
            .entry(user)
            .or_default()
            .entry(asset.to_string())
            .or_default();
        entry.balance = entry
            .balance
            .checked_add(amount)
            .ok_or_else(|| EngineError::InternalInvariant("balance overflow".into()))?;
        Ok(())
    }

    /// Debit `amount` from a user; never goes negative
    pub fn sub_balance(
        &mut self,
        user: Address,
        asset: &str,
        amount: U256,
    ) -> Result<(), EngineError> {
        let entry = self.entry_mut(user, asset);
        if entry.balance < amount {
            let available = entry.balance;
            return Err(EngineError::InsufficientFunds {
                asset: asset.to_string(),
                required: amount.to_string(),
                available: available.to_string(),
            });
        }
        entry.balance -= amount;
        Ok(())
    }

    /// Reserve `amount` of a user's available balance
    pub fn lock(&mut self, user: Address, asset: &str, amount: U256) -> Result<(), EngineError> {
        let entry = self.entry_mut(user, asset);
        if entry.available() < amount {
            let available = entry.available();
            return Err(EngineError::InsufficientFunds {
                asset: asset.to_string(),
                required: amount.to_string(),
                available: available.to_string(),
            });
        }
        entry.locked += amount;
        Ok(())
    }

    /// Release `amount` of a user's reservation
    pub fn unlock(&mut self, user: Address, asset: &str, amount: U256) -> Result<(), EngineError> {
        let entry = self.entry_mut(user, asset);
        if entry.locked < amount {
            return Err(EngineError::InternalInvariant(format!(
                "unlock of {} {} exceeds locked {}",
                amount, asset, entry.locked
            )));
        }
        entry.locked -= amount;
        Ok(())
    }

    /// Total holdings of an asset
    pub fn balance(&self, user: Address, asset: &str) -> U256 {
        self.get(user, asset).map(|b| b.balance).unwrap_or_default()
    }

    /// Reserved portion of an asset
    pub fn locked(&self, user: Address, asset: &str) -> U256 {
        self.get(user, asset).map(|b| b.locked).unwrap_or_default()
    }

    /// Spendable portion of an asset
    pub fn available(&self, user: Address, asset: &str) -> U256 {
        self.get(user, asset)
            .map(|b| b.available())
            .unwrap_or_default()
    }

    fn get(&self, user: Address, asset: &str) -> Option<&AssetBalance> {
        self.accounts.get(&user).and_then(|a| a.get(asset))
    }

    fn entry_mut(&mut self, user: Address, asset: &str) -> &mut AssetBalance {
        self.accounts
            .entry(user)
            .or_default()
            .entry(asset.to_string())
            .or_default()
    }
}
