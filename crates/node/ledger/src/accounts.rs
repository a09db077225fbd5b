//! In-memory account state.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::ExecutionError;

/// Balance and nonce of one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Number of EVM transactions sent.
    pub nonce: u64,
    /// Balance in the base denom.
    pub balance: U256,
}

/// Account state after some block.
///
/// Cloned once per block to serve historical queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountState {
    accounts: BTreeMap<Address, Account>,
}

impl AccountState {
    /// Build the state described by a genesis allocation.
    pub fn from_alloc(alloc: impl IntoIterator<Item = (Address, U256)>) -> Self {
        let accounts =
            alloc.into_iter().map(|(address, balance)| (address, Account { nonce: 0, balance }));
        Self { accounts: accounts.collect() }
    }

    /// Account at `address`; absent accounts are empty.
    pub fn account(&self, address: &Address) -> Account {
        self.accounts.get(address).copied().unwrap_or_default()
    }

    /// Nonce of `address`.
    pub fn nonce(&self, address: &Address) -> u64 {
        self.account(address).nonce
    }

    /// Balance of `address`.
    pub fn balance(&self, address: &Address) -> U256 {
        self.account(address).balance
    }

    /// Add `amount` to `address`.
    pub fn credit(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Remove `amount` from `address`.
    pub fn debit(&mut self, address: Address, amount: U256) -> Result<(), ExecutionError> {
        let has = self.balance(&address);
        let remaining = has
            .checked_sub(amount)
            .ok_or(ExecutionError::InsufficientFunds { address, has, needs: amount })?;
        self.accounts.entry(address).or_default().balance = remaining;
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ExecutionError> {
        self.debit(from, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    /// Increment the nonce of `address`.
    pub fn bump_nonce(&mut self, address: Address) {
        let account = self.accounts.entry(address).or_default();
        account.nonce = account.nonce.saturating_add(1);
    }

    /// Number of accounts ever touched.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no account exists.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
