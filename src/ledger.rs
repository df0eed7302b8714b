//! Per-principal spendable balances
//!
//! Accounts spring into existence on first funding and are never removed.
//! Debits are an atomic check-and-subtract on the account entry, so two games
//! debiting the same principal concurrently can never overdraw it.

use crate::errors::{WagerError, WagerResult};
use dashmap::DashMap;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Ledger {
    balances: DashMap<String, u64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted balances
    pub fn from_balances(balances: BTreeMap<String, u64>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
        }
    }

    /// Credit `amount` to `account` unconditionally, returning the new balance
    pub fn fund(&self, account: &str, amount: u64) -> WagerResult<u64> {
        require_principal(account)?;
        self.credit(account, amount)
    }

    /// Balance of `account`, zero when it has never been funded
    pub fn balance_of(&self, account: &str) -> u64 {
        self.balances.get(account).map(|b| *b).unwrap_or(0)
    }

    pub(crate) fn debit(&self, account: &str, amount: u64) -> WagerResult<u64> {
        let mut entry = self.balances.get_mut(account).ok_or_else(|| {
            WagerError::InsufficientFunds {
                account: account.to_string(),
                required: amount,
                available: 0,
            }
        })?;
        let available = *entry;
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| WagerError::InsufficientFunds {
                account: account.to_string(),
                required: amount,
                available,
            })?;
        *entry = remaining;
        debug!(account, amount, remaining, "ledger debit");
        Ok(remaining)
    }

    pub(crate) fn credit(&self, account: &str, amount: u64) -> WagerResult<u64> {
        let mut entry = self.balances.entry(account.to_string()).or_insert(0);
        let updated = entry.checked_add(amount).ok_or_else(|| {
            WagerError::invalid_argument(format!("crediting {} to {} overflows", amount, account))
        })?;
        *entry = updated;
        debug!(account, amount, balance = updated, "ledger credit");
        Ok(updated)
    }

    /// Sum of every balance held by the ledger
    pub fn total_balance(&self) -> u128 {
        self.balances.iter().map(|b| *b.value() as u128).sum()
    }

    /// Sorted copy of every balance
    pub fn balances(&self) -> BTreeMap<String, u64> {
        self.balances
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

pub(crate) fn require_principal(principal: &str) -> WagerResult<()> {
    if principal.trim().is_empty() {
        return Err(WagerError::invalid_argument("principal must not be empty"));
    }
    Ok(())
}
