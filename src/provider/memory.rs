//! In-memory asset provider
//!
//! Holds balances for one asset in RAM. Used by the driver binary and the
//! scenario tests; production deployments bind their own providers.
//!
//! Fault injection lets callers exercise the settlement failure paths:
//! - `set_fail_transfers(true)` makes every transfer fail
//! - `fail_transfers_after(n)` lets `n` more transfers succeed, then fails

use std::sync::Mutex;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::AssetProvider;
use crate::core_types::AccountId;
use crate::error::ProviderError;

#[derive(Debug, Default)]
struct Ledger {
    balances: FxHashMap<AccountId, u64>,
    fail_all: bool,
    /// Remaining successful transfers before injected failure
    fail_after: Option<usize>,
}

/// In-memory balance table for a single asset
#[derive(Debug)]
pub struct MemoryAsset {
    name: String,
    symbol: String,
    decimals: u32,
    ledger: Mutex<Ledger>,
}

impl MemoryAsset {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u32) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        // Transfers never panic mid-update, so a poisoned table is still consistent
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Credit `amount` to `account`
    ///
    /// # Errors
    /// Returns error on overflow.
    pub fn deposit(&self, account: AccountId, amount: u64) -> Result<(), ProviderError> {
        let mut ledger = self.ledger();
        let balance = ledger.balances.entry(account).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| ProviderError::Rejected("deposit overflow".into()))?;
        Ok(())
    }

    /// Current balance of `account` (0 if never credited)
    pub fn balance_of(&self, account: AccountId) -> u64 {
        self.ledger().balances.get(&account).copied().unwrap_or(0)
    }

    pub fn set_fail_transfers(&self, fail: bool) {
        self.ledger().fail_all = fail;
    }

    pub fn fail_transfers_after(&self, successes: usize) {
        self.ledger().fail_after = Some(successes);
    }

    pub fn clear_faults(&self) {
        let mut ledger = self.ledger();
        ledger.fail_all = false;
        ledger.fail_after = None;
    }
}

#[async_trait]
impl AssetProvider for MemoryAsset {
    async fn transfer(
        &self,
        quantity: u64,
        from: AccountId,
        to: AccountId,
    ) -> Result<bool, ProviderError> {
        let mut ledger = self.ledger();

        if ledger.fail_all {
            return Err(ProviderError::Unavailable("injected failure".into()));
        }
        if let Some(remaining) = ledger.fail_after {
            if remaining == 0 {
                return Err(ProviderError::Unavailable("injected failure".into()));
            }
            ledger.fail_after = Some(remaining - 1);
        }

        let from_balance = ledger.balances.get(&from).copied().unwrap_or(0);
        if from_balance < quantity {
            return Err(ProviderError::InsufficientBalance);
        }
        if from == to {
            return Ok(true);
        }
        let to_balance = ledger.balances.get(&to).copied().unwrap_or(0);
        let new_to = to_balance
            .checked_add(quantity)
            .ok_or_else(|| ProviderError::Rejected("credit overflow".into()))?;

        ledger.balances.insert(from, from_balance - quantity);
        ledger.balances.insert(to, new_to);
        debug!(symbol = %self.symbol, quantity, from, to, "Memory transfer");
        Ok(true)
    }

    async fn get_balance(&self, account: AccountId) -> Result<u64, ProviderError> {
        Ok(self.balance_of(account))
    }

    async fn get_decimals(&self) -> Result<u32, ProviderError> {
        Ok(self.decimals)
    }

    async fn get_name(&self) -> Result<String, ProviderError> {
        Ok(self.name.clone())
    }

    async fn get_symbol(&self) -> Result<String, ProviderError> {
        Ok(self.symbol.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_moves_balance() {
        let asset = MemoryAsset::new("Test Token", "TST", 6);
        asset.deposit(1, 100).unwrap();

        assert_eq!(asset.transfer(40, 1, 2).await, Ok(true));
        assert_eq!(asset.balance_of(1), 60);
        assert_eq!(asset.balance_of(2), 40);
    }

    #[tokio::test]
    async fn test_transfer_insufficient() {
        let asset = MemoryAsset::new("Test Token", "TST", 6);
        asset.deposit(1, 10).unwrap();

        assert_eq!(
            asset.transfer(11, 1, 2).await,
            Err(ProviderError::InsufficientBalance)
        );
        assert_eq!(asset.balance_of(1), 10);
        assert_eq!(asset.balance_of(2), 0);
    }

    #[tokio::test]
    async fn test_fail_after() {
        let asset = MemoryAsset::new("Test Token", "TST", 6);
        asset.deposit(1, 100).unwrap();
        asset.fail_transfers_after(1);

        assert_eq!(asset.transfer(10, 1, 2).await, Ok(true));
        assert!(asset.transfer(10, 1, 2).await.is_err());
        assert_eq!(asset.balance_of(1), 90);

        asset.clear_faults();
        assert_eq!(asset.transfer(10, 1, 2).await, Ok(true));
    }

    #[tokio::test]
    async fn test_fail_all() {
        let asset = MemoryAsset::new("Test Token", "TST", 6);
        asset.deposit(1, 100).unwrap();
        asset.set_fail_transfers(true);
        assert!(asset.transfer(1, 1, 2).await.is_err());
        assert_eq!(asset.balance_of(1), 100);
    }

    #[tokio::test]
    async fn test_metadata() {
        let asset = MemoryAsset::new("Test Token", "TST", 8);
        assert_eq!(asset.get_name().await.unwrap(), "Test Token");
        assert_eq!(asset.get_symbol().await.unwrap(), "TST");
        assert_eq!(asset.get_decimals().await.unwrap(), 8);
    }

    #[test]
    fn test_deposit_overflow() {
        let asset = MemoryAsset::new("Test Token", "TST", 6);
        asset.deposit(1, u64::MAX).unwrap();
        assert!(asset.deposit(1, 1).is_err());
    }
}
